//! Risk report assembly.
//!
//! A [`RiskReport`] is built once per transaction from the resolution, the
//! chosen classifier's result and timing, and is then only read.

use chrono::DateTime;
use serde::Serialize;

use guard_data::network::network_label;
use guard_data::types::fee_rate;
use guard_data::units::{fee_wei, round3, wei_to_eth, wei_to_gwei};
use guard_data::{ChainReceipt, ChainTransaction, ExecutionStatus, TxHash};

use crate::classify::{AbsoluteThreshold, ContextThresholds, FeeVerdict};
use crate::resolver::{Resolution, RECEIPT_RACE_NOTE};
use crate::sampler::GasPriceSample;
use crate::stats::GasPriceStats;

/// Process exit code: ok / within threshold.
pub const EXIT_OK: u8 = 0;
/// Process exit code: invalid input or connection failure.
pub const EXIT_INVALID_INPUT: u8 = 1;
/// Process exit code: transaction not found or polling gave up.
pub const EXIT_NOT_FOUND: u8 = 2;
/// Process exit code: fee flagged as high.
pub const EXIT_HIGH_FEE: u8 = 3;

/// Terminal state of the lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    /// Mined with a receipt.
    Included,
    /// Known but not mined (includes the receipt race).
    Pending,
    /// The chain has no record of the hash.
    NotFound,
    /// Polling budget exhausted before the transaction was mined.
    GaveUp,
}

/// Contextual sampling details carried in the report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContextSummary {
    /// Head block of the window.
    pub head: u64,
    /// Window size in blocks.
    pub window_blocks: u64,
    /// Stride.
    pub step: u64,
    /// Blocks fetched successfully.
    pub sampled_blocks: usize,
    /// Blocks that failed to load.
    pub failed_blocks: usize,
    /// Gas price statistics in gwei, rounded to 3 decimals.
    pub gas_price_gwei: GasPriceStats,
    /// Median multiplier.
    pub warn_mult_median: f64,
    /// p95 multiplier.
    pub warn_mult_p95: f64,
}

/// Assembled per-transaction report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RiskReport {
    /// Canonical transaction hash.
    pub tx_hash: TxHash,
    pub chain_id: Option<u64>,
    /// Human label for `chain_id`.
    pub network: String,
    /// Terminal lookup state; drives the exit code.
    pub state: TxState,
    /// True when the transaction is known but has no receipt yet, including
    /// the receipt race.
    pub pending: bool,
    pub from: Option<String>,
    /// Recipient; `None` for contract creation.
    pub to: Option<String>,
    /// Execution status from the receipt.
    pub status: Option<ExecutionStatus>,
    pub block_number: Option<u64>,
    /// Inclusion block time, `YYYY-MM-DD HH:MM:SS UTC`.
    pub timestamp_utc: Option<String>,
    /// Blocks on top of the inclusion block at report time.
    pub confirmations: Option<u64>,
    pub gas_used: Option<u64>,
    /// Effective rate when the receipt has one, else the offered rate.
    pub gas_price_wei: Option<u128>,
    pub gas_price_gwei: Option<f64>,
    /// Exact `gas_used * gas_price_wei`; only for mined transactions.
    pub total_fee_wei: Option<u128>,
    pub total_fee_eth: Option<f64>,
    /// Absolute-mode threshold, when that classifier ran.
    pub fee_threshold_eth: Option<f64>,
    /// Flag from whichever classifier ran.
    pub high_fee: bool,
    /// Contextual-mode verdict.
    pub classification: Option<FeeVerdict>,
    /// Sampling window and statistics behind `classification`.
    pub context: Option<ContextSummary>,
    /// Receipt lookups made by `watch`.
    pub poll_attempts: Option<u32>,
    /// Why the report is incomplete (not found, gave up, receipt race).
    pub note: Option<String>,
    /// Wall time of the lookup, rounded to milliseconds.
    pub elapsed_seconds: f64,
}

impl RiskReport {
    /// Exit code for this report: not found / gave up = 2, high fee = 3,
    /// otherwise 0.
    pub fn exit_code(&self) -> u8 {
        match self.state {
            TxState::NotFound | TxState::GaveUp => EXIT_NOT_FOUND,
            _ if self.high_fee => EXIT_HIGH_FEE,
            _ => EXIT_OK,
        }
    }
}

/// Confirmations on top of the inclusion block, never negative.
pub fn confirmations(head: u64, inclusion_block: u64) -> u64 {
    head.saturating_sub(inclusion_block)
}

/// Renders a unix timestamp as `YYYY-MM-DD HH:MM:SS UTC`.
pub fn format_utc(timestamp: u64) -> Option<String> {
    let secs = i64::try_from(timestamp).ok()?;
    DateTime::from_timestamp(secs, 0).map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

/// Verdict produced by whichever classifier ran.
#[derive(Clone, Debug, PartialEq)]
pub enum Assessment {
    /// Absolute mode; the flag is derived from the total fee during assembly.
    Absolute(AbsoluteThreshold),
    /// Contextual mode with its sample and verdict.
    Contextual {
        /// Sample the verdict was computed against.
        sample: GasPriceSample,
        /// Multipliers used.
        thresholds: ContextThresholds,
        /// Verdict.
        verdict: FeeVerdict,
    },
}

/// Chain-derived facts gathered by a pipeline before assembly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChainFacts {
    /// Chain id, if the node reported one.
    pub chain_id: Option<u64>,
    /// Head block at report time, if looked up.
    pub head: Option<u64>,
    /// Inclusion block timestamp, if looked up.
    pub block_timestamp: Option<u64>,
    /// Poll attempts, for watch mode.
    pub poll_attempts: Option<u32>,
}

/// Outcome handed to the assembler.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// One-shot (or post-poll) resolution.
    Resolved(Resolution),
    /// Polling exhausted its budget.
    GaveUp,
}

/// Builds the immutable report.
pub fn assemble(
    hash: TxHash,
    outcome: Outcome,
    facts: ChainFacts,
    assessment: Option<Assessment>,
    elapsed_seconds: f64,
) -> RiskReport {
    let mut report = RiskReport {
        tx_hash: hash,
        chain_id: facts.chain_id,
        network: network_label(facts.chain_id),
        state: TxState::NotFound,
        pending: false,
        from: None,
        to: None,
        status: None,
        block_number: None,
        timestamp_utc: None,
        confirmations: None,
        gas_used: None,
        gas_price_wei: None,
        gas_price_gwei: None,
        total_fee_wei: None,
        total_fee_eth: None,
        fee_threshold_eth: None,
        high_fee: false,
        classification: None,
        context: None,
        poll_attempts: facts.poll_attempts,
        note: None,
        elapsed_seconds: round3(elapsed_seconds),
    };

    let (tx, receipt): (Option<&ChainTransaction>, Option<&ChainReceipt>) = match &outcome {
        Outcome::GaveUp => {
            report.state = TxState::GaveUp;
            report.note = Some("gave up waiting for transaction to be mined".to_string());
            (None, None)
        }
        Outcome::Resolved(Resolution::NotFound) => {
            report.note = Some("transaction not found".to_string());
            (None, None)
        }
        Outcome::Resolved(Resolution::Pending(tx)) => {
            report.state = TxState::Pending;
            report.pending = true;
            (Some(tx), None)
        }
        Outcome::Resolved(Resolution::ReceiptPending(tx)) => {
            report.state = TxState::Pending;
            report.pending = true;
            report.block_number = tx.block_number;
            report.note = Some(RECEIPT_RACE_NOTE.to_string());
            (Some(tx), None)
        }
        Outcome::Resolved(Resolution::Included(tx, receipt)) => {
            report.state = TxState::Included;
            (Some(tx), Some(receipt))
        }
    };

    if let Some(tx) = tx {
        report.from = tx.from.map(|a| format!("{a:#x}"));
        report.to = tx.to.map(|a| format!("{a:#x}"));
    }

    let rate = fee_rate(
        receipt.and_then(|r| r.effective_gas_price),
        tx.and_then(|t| t.gas_price),
    );
    report.gas_price_wei = rate;
    report.gas_price_gwei = rate.map(|r| round3(wei_to_gwei(r)));

    if let Some(receipt) = receipt {
        report.status = Some(ExecutionStatus::from(receipt.status));
        report.block_number = Some(receipt.block_number);
        report.gas_used = Some(receipt.gas_used);
        report.confirmations = facts
            .head
            .map(|head| confirmations(head, receipt.block_number));
        report.timestamp_utc = facts.block_timestamp.and_then(format_utc);

        if let Some(rate) = rate {
            let total = fee_wei(receipt.gas_used, rate);
            report.total_fee_wei = Some(total);
            report.total_fee_eth = Some(wei_to_eth(total));
        }
    }

    match assessment {
        Some(Assessment::Absolute(threshold)) => {
            report.fee_threshold_eth = Some(threshold.threshold_eth);
            report.high_fee = report
                .total_fee_wei
                .map(|total| threshold.is_high_fee(total))
                .unwrap_or(false);
        }
        Some(Assessment::Contextual {
            sample,
            thresholds,
            verdict,
        }) => {
            report.high_fee = verdict.is_high();
            report.classification = Some(verdict);
            report.context = Some(ContextSummary {
                head: sample.head,
                window_blocks: sample.window.blocks,
                step: sample.window.step,
                sampled_blocks: sample.sampled_blocks,
                failed_blocks: sample.failed_blocks,
                gas_price_gwei: sample.stats.rounded(),
                warn_mult_median: thresholds.median_multiplier,
                warn_mult_p95: thresholds.p95_multiplier,
            });
        }
        None => {}
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use guard_data::mock::{sample_hash, sample_receipt, sample_transaction};

    const GWEI: u128 = 1_000_000_000;

    fn included(effective: Option<u128>) -> Outcome {
        let hash = sample_hash(1);
        Outcome::Resolved(Resolution::Included(
            sample_transaction(hash, Some(1_000), 60 * GWEI),
            sample_receipt(1_000, effective),
        ))
    }

    #[test]
    fn confirmations_never_negative() {
        assert_eq!(confirmations(1_000, 1_005), 0);
        assert_eq!(confirmations(1_010, 1_000), 10);
    }

    #[test]
    fn included_report_prefers_effective_rate_and_computes_exact_fee() {
        let facts = ChainFacts {
            chain_id: Some(1),
            head: Some(1_012),
            block_timestamp: Some(1_708_617_600),
            poll_attempts: None,
        };
        let threshold = AbsoluteThreshold::new(0.01).unwrap();

        let report = assemble(
            sample_hash(1),
            included(Some(50 * GWEI)),
            facts,
            Some(Assessment::Absolute(threshold)),
            0.123_456,
        );

        assert_eq!(report.state, TxState::Included);
        assert_eq!(report.network, "Ethereum Mainnet");
        assert_eq!(report.gas_price_wei, Some(50 * GWEI));
        assert_eq!(report.total_fee_wei, Some(1_050_000_000_000_000));
        assert_eq!(report.confirmations, Some(12));
        assert_eq!(report.timestamp_utc.as_deref(), Some("2024-02-22 16:00:00 UTC"));
        assert_eq!(report.status, Some(ExecutionStatus::Success));
        assert_eq!(report.elapsed_seconds, 0.123);
        assert!(!report.high_fee);
        assert_eq!(report.exit_code(), EXIT_OK);
    }

    #[test]
    fn falls_back_to_offered_rate() {
        let report = assemble(
            sample_hash(1),
            included(None),
            ChainFacts::default(),
            Some(Assessment::Absolute(AbsoluteThreshold::new(0.001).unwrap())),
            0.0,
        );
        assert_eq!(report.gas_price_wei, Some(60 * GWEI));
        assert!(report.high_fee);
        assert_eq!(report.exit_code(), EXIT_HIGH_FEE);
    }

    #[test]
    fn not_found_and_gave_up_exit_with_two() {
        let not_found = assemble(
            sample_hash(2),
            Outcome::Resolved(Resolution::NotFound),
            ChainFacts::default(),
            None,
            0.0,
        );
        assert_eq!(not_found.state, TxState::NotFound);
        assert_eq!(not_found.network, "Unknown network");
        assert_eq!(not_found.exit_code(), EXIT_NOT_FOUND);

        let gave_up = assemble(sample_hash(2), Outcome::GaveUp, ChainFacts::default(), None, 0.0);
        assert_eq!(gave_up.state, TxState::GaveUp);
        assert_eq!(gave_up.exit_code(), EXIT_NOT_FOUND);
    }

    #[test]
    fn receipt_race_is_pending_with_note() {
        let hash = sample_hash(3);
        let report = assemble(
            hash,
            Outcome::Resolved(Resolution::ReceiptPending(sample_transaction(
                hash,
                Some(77),
                GWEI,
            ))),
            ChainFacts::default(),
            Some(Assessment::Absolute(AbsoluteThreshold::new(0.0).unwrap())),
            0.0,
        );
        assert!(report.pending);
        assert_eq!(report.block_number, Some(77));
        assert_eq!(report.note.as_deref(), Some(RECEIPT_RACE_NOTE));
        assert_eq!(report.total_fee_wei, None);
        assert!(!report.high_fee);
        assert_eq!(report.exit_code(), EXIT_OK);
    }

    #[test]
    fn json_uses_snake_case_fields() {
        let report = assemble(
            sample_hash(4),
            Outcome::Resolved(Resolution::NotFound),
            ChainFacts::default(),
            None,
            1.0,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "not_found");
        assert_eq!(json["tx_hash"], sample_hash(4).to_string());
        assert_eq!(json["elapsed_seconds"], 1.0);
        assert!(json["total_fee_wei"].is_null());
    }
}
