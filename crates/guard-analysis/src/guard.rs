//! End-to-end fee guard pipelines.
//!
//! [`inspect`] resolves a transaction once; [`watch`] polls until it is
//! mined. Both finish by running the configured [`FeeCheck`] and assembling
//! a [`RiskReport`]. Transport failures on the primary lookups propagate as
//! errors; lookups that only enrich the report (head, block timestamp) are
//! logged and left empty when they fail.

use std::time::Instant;

use eyre::{Context, Result};

use guard_data::types::fee_rate;
use guard_data::units::wei_to_gwei;
use guard_data::{ChainClient, ChainTransaction, TxHash};

use crate::classify::{classify_contextual, FeeCheck};
use crate::poller::{poll_receipt, PollConfig, PollOutcome};
use crate::report::{assemble, Assessment, ChainFacts, Outcome, RiskReport};
use crate::resolver::{resolve, Resolution};
use crate::sampler::sample_gas_prices;

/// One-shot lookup and fee check.
///
/// A pending transaction is reported as pending immediately. In contextual
/// mode the offered rate of a pending transaction is still classified.
///
/// # Errors
/// Returns error if the transaction or receipt lookup fails at the transport
/// level, or if the sampling head cannot be determined.
#[tracing::instrument(skip(client, hash, check), fields(tx_hash = %hash))]
pub async fn inspect<C: ChainClient>(
    client: &C,
    hash: TxHash,
    check: &FeeCheck,
) -> Result<RiskReport> {
    let started = Instant::now();
    let chain_id = client.chain_id().await;

    let resolution = resolve(client, &hash).await?;
    let facts = gather_facts(client, chain_id, &resolution, None).await;
    let elapsed = started.elapsed().as_secs_f64();

    let assessment = assess(client, &resolution, check).await?;
    let report = assemble(
        hash,
        Outcome::Resolved(resolution),
        facts,
        assessment,
        elapsed,
    );

    tracing::info!(
        state = ?report.state,
        high_fee = report.high_fee,
        elapsed_seconds = report.elapsed_seconds,
        "inspection finished"
    );
    Ok(report)
}

/// Polls until the transaction is mined (or the budget runs out), then runs
/// the fee check.
///
/// # Errors
/// Returns error if a receipt lookup fails with anything other than "not yet
/// available", or if the transaction lookup after mining fails.
#[tracing::instrument(skip(client, hash, poll, check), fields(tx_hash = %hash))]
pub async fn watch<C: ChainClient>(
    client: &C,
    hash: TxHash,
    poll: &PollConfig,
    check: &FeeCheck,
) -> Result<RiskReport> {
    let started = Instant::now();
    let chain_id = client.chain_id().await;

    let (receipt, attempts) = match poll_receipt(client, &hash, poll).await? {
        PollOutcome::Included { receipt, attempts } => (receipt, attempts),
        PollOutcome::GaveUp { attempts } => {
            let facts = ChainFacts {
                chain_id,
                poll_attempts: Some(attempts),
                ..ChainFacts::default()
            };
            return Ok(assemble(
                hash,
                Outcome::GaveUp,
                facts,
                None,
                started.elapsed().as_secs_f64(),
            ));
        }
    };

    let tx = client
        .transaction(&hash)
        .await
        .wrap_err("error while fetching transaction")?
        .unwrap_or_else(|| {
            tracing::warn!("receipt found but transaction lookup returned nothing");
            ChainTransaction {
                hash,
                from: None,
                to: None,
                block_number: Some(receipt.block_number),
                gas_price: None,
            }
        });

    let resolution = Resolution::Included(tx, receipt);
    let facts = gather_facts(client, chain_id, &resolution, Some(attempts)).await;
    let assessment = assess(client, &resolution, check).await?;

    Ok(assemble(
        hash,
        Outcome::Resolved(resolution),
        facts,
        assessment,
        started.elapsed().as_secs_f64(),
    ))
}

async fn gather_facts<C: ChainClient>(
    client: &C,
    chain_id: Option<u64>,
    resolution: &Resolution,
    poll_attempts: Option<u32>,
) -> ChainFacts {
    let mut facts = ChainFacts {
        chain_id,
        poll_attempts,
        ..ChainFacts::default()
    };

    let Resolution::Included(_, receipt) = resolution else {
        return facts;
    };

    match client.block(receipt.block_number, false).await {
        Ok(Some(block)) => facts.block_timestamp = Some(block.timestamp),
        Ok(None) => tracing::warn!(block_number = receipt.block_number, "inclusion block not found"),
        Err(e) => tracing::warn!(block_number = receipt.block_number, error = %e, "failed to fetch inclusion block"),
    }

    match client.block_number().await {
        Ok(head) => facts.head = Some(head),
        Err(e) => tracing::warn!(error = %e, "failed to fetch head block; confirmations unknown"),
    }

    facts
}

async fn assess<C: ChainClient>(
    client: &C,
    resolution: &Resolution,
    check: &FeeCheck,
) -> Result<Option<Assessment>> {
    match check {
        FeeCheck::Absolute(threshold) => Ok(Some(Assessment::Absolute(*threshold))),
        FeeCheck::Contextual {
            window,
            thresholds,
            show_progress,
        } => {
            let Some(tx) = resolution.transaction() else {
                return Ok(None);
            };
            let receipt = match resolution {
                Resolution::Included(_, receipt) => Some(receipt),
                _ => None,
            };

            // A missing rate classifies as 0, which is always "ok".
            let target_gwei = fee_rate(receipt.and_then(|r| r.effective_gas_price), tx.gas_price)
                .map(wei_to_gwei)
                .unwrap_or(0.0);

            let sample = sample_gas_prices(client, *window, None, *show_progress)
                .await
                .wrap_err("failed to sample recent gas prices")?;
            let verdict =
                classify_contextual(target_gwei, sample.stats.median, sample.stats.p95, thresholds);

            tracing::info!(
                target_gwei,
                median_gwei = sample.stats.median,
                p95_gwei = sample.stats.p95,
                %verdict,
                "contextual fee classification"
            );

            Ok(Some(Assessment::Contextual {
                sample,
                thresholds: *thresholds,
                verdict,
            }))
        }
    }
}
