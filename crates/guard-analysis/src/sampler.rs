//! Gas price sampling over a recent block window.
//!
//! Walks back from the head block at a fixed stride, collects the fee rate of
//! every transaction in each visited block, and summarizes the flat sample.
//! Blocks are fetched one at a time; a block that fails to load is logged
//! and skipped so a flaky node degrades the sample instead of aborting it.

use eyre::{eyre, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use guard_data::units::wei_to_gwei;
use guard_data::ChainClient;

use crate::stats::GasPriceStats;

/// Upper bound on the sampled window, in blocks.
pub const MAX_WINDOW_BLOCKS: u64 = 10_000;

/// Validated sampling window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SampleWindow {
    /// Number of recent blocks covered (head included).
    pub blocks: u64,
    /// Visit every `step`-th block.
    pub step: u64,
}

impl SampleWindow {
    /// Validates the window; oversized windows are clamped to
    /// [`MAX_WINDOW_BLOCKS`] with a warning.
    ///
    /// # Errors
    /// Returns error if `blocks` or `step` is zero.
    pub fn new(blocks: u64, step: u64) -> Result<Self> {
        if blocks == 0 || step == 0 {
            return Err(eyre!("--blocks and --step must be > 0"));
        }

        let blocks = if blocks > MAX_WINDOW_BLOCKS {
            tracing::warn!(
                requested = blocks,
                limit = MAX_WINDOW_BLOCKS,
                "limiting sample window to avoid excessive RPC load"
            );
            MAX_WINDOW_BLOCKS
        } else {
            blocks
        };

        Ok(Self { blocks, step })
    }

    /// Block numbers to visit, newest first: `head, head - step, ...` down to
    /// `max(0, head - blocks + 1)` inclusive.
    pub fn block_numbers(&self, head: u64) -> Vec<u64> {
        let start = (head + 1).saturating_sub(self.blocks);
        let step = usize::try_from(self.step).unwrap_or(usize::MAX);
        (start..=head).rev().step_by(step).collect()
    }
}

/// Result of one sampling pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GasPriceSample {
    /// Head block the window ends at.
    pub head: u64,
    /// Blocks that were fetched successfully.
    pub sampled_blocks: usize,
    /// Blocks that failed to load or were missing.
    pub failed_blocks: usize,
    /// Window used for the pass.
    pub window: SampleWindow,
    /// Statistics over all collected fee rates, in gwei.
    pub stats: GasPriceStats,
}

/// Samples gas prices (gwei) over `window`, ending at `head` (or the chain
/// head when `None`).
///
/// # Errors
/// Returns error only if the head block number cannot be determined.
#[tracing::instrument(skip(client, window), fields(blocks = window.blocks, step = window.step))]
pub async fn sample_gas_prices<C: ChainClient>(
    client: &C,
    window: SampleWindow,
    head: Option<u64>,
    show_progress: bool,
) -> Result<GasPriceSample> {
    let head = match head {
        Some(head) => head,
        None => client.block_number().await?,
    };
    let numbers = window.block_numbers(head);

    tracing::info!(
        head,
        blocks = window.blocks,
        step = window.step,
        to_fetch = numbers.len(),
        "sampling gas prices"
    );

    let pb = if show_progress {
        let pb = ProgressBar::new(numbers.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} blocks")
                .map_err(|e| eyre!("failed to create progress style: {e}"))?
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut samples = Vec::new();
    let mut sampled_blocks = 0usize;
    let mut failed_blocks = 0usize;

    for number in numbers {
        match client.block(number, true).await {
            Ok(Some(block)) => {
                sampled_blocks += 1;
                samples.extend(
                    block
                        .transactions
                        .iter()
                        .filter_map(|tx| tx.fee_rate())
                        .map(wei_to_gwei),
                );
            }
            Ok(None) => {
                tracing::warn!(block_number = number, "block not found in RPC");
                failed_blocks += 1;
            }
            Err(e) => {
                tracing::warn!(block_number = number, error = %e, "skipping block that failed to load");
                failed_blocks += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let stats = GasPriceStats::from_samples(&samples);
    tracing::debug!(
        sampled_blocks,
        failed_blocks,
        count = stats.count,
        median = stats.median,
        p95 = stats.p95,
        "gas price sample complete"
    );

    Ok(GasPriceSample {
        head,
        sampled_blocks,
        failed_blocks,
        window,
        stats,
    })
}
