//! Bounded polling for a transaction receipt.

use std::time::Duration;

use eyre::{eyre, Context, Result};

use guard_data::{ChainClient, ChainReceipt, TxHash};

/// Polling schedule: fixed interval, bounded attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PollConfig {
    /// Sleep between attempts.
    pub interval: Duration,
    /// Maximum number of receipt lookups.
    pub max_attempts: u32,
}

impl PollConfig {
    /// # Errors
    /// Returns error if `max_attempts` is zero or `interval_secs` is not a
    /// positive finite number.
    pub fn new(interval_secs: f64, max_attempts: u32) -> Result<Self> {
        if max_attempts == 0 {
            return Err(eyre!("--max-attempts must be > 0"));
        }
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return Err(eyre!("--interval must be > 0 seconds, got {interval_secs}"));
        }
        let interval = Duration::try_from_secs_f64(interval_secs)
            .map_err(|_| eyre!("--interval is out of range: {interval_secs}"))?;
        Ok(Self {
            interval,
            max_attempts,
        })
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

/// How a poll loop ended without error.
#[derive(Clone, Debug, PartialEq)]
pub enum PollOutcome {
    /// Receipt found on attempt `attempts`.
    Included {
        /// The receipt.
        receipt: ChainReceipt,
        /// Lookups made, including the successful one.
        attempts: u32,
    },
    /// Every attempt reported "not yet available".
    GaveUp {
        /// Lookups made.
        attempts: u32,
    },
}

/// Polls for the receipt of `hash` until it appears or the budget runs out.
///
/// Only "not yet available" is retried. Any other failure aborts the loop
/// and is returned as an error. There is no sleep after a successful lookup
/// or after the final attempt.
///
/// # Errors
/// Returns error if a receipt lookup fails.
#[tracing::instrument(skip(client, hash, config), fields(tx_hash = %hash, max_attempts = config.max_attempts))]
pub async fn poll_receipt<C: ChainClient>(
    client: &C,
    hash: &TxHash,
    config: &PollConfig,
) -> Result<PollOutcome> {
    for attempt in 1..=config.max_attempts {
        let receipt = client
            .receipt(hash)
            .await
            .wrap_err_with(|| format!("error while fetching receipt (attempt {attempt})"))?;

        if let Some(receipt) = receipt {
            tracing::info!(attempt, block_number = receipt.block_number, "transaction mined");
            return Ok(PollOutcome::Included {
                receipt,
                attempts: attempt,
            });
        }

        let remaining = config.max_attempts - attempt;
        tracing::info!(attempt, max_attempts = config.max_attempts, remaining, "pending");

        if remaining > 0 {
            tokio::time::sleep(config.interval).await;
        }
    }

    tracing::warn!(
        attempts = config.max_attempts,
        "gave up waiting for transaction to be mined"
    );
    Ok(PollOutcome::GaveUp {
        attempts: config.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use guard_data::mock::{sample_hash, sample_receipt, MockChain, ReceiptStep};

    fn config(max_attempts: u32) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(5),
            max_attempts,
        }
    }

    #[test]
    fn config_validation() {
        assert!(PollConfig::new(5.0, 0).is_err());
        assert!(PollConfig::new(-1.0, 3).is_err());
        assert!(PollConfig::new(0.0, 3).is_err());
        assert!(PollConfig::new(f64::INFINITY, 3).is_err());
        let ok = PollConfig::new(0.5, 3).unwrap();
        assert_eq!(ok.interval, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn included_after_k_pending_attempts_without_trailing_sleep() {
        let hash = sample_hash(7);
        let chain = MockChain::new(100)
            .with_receipt(hash, sample_receipt(99, Some(1)))
            .with_receipt_script([ReceiptStep::NotYet, ReceiptStep::NotYet, ReceiptStep::Ready]);

        let started = tokio::time::Instant::now();
        let outcome = poll_receipt(&chain, &hash, &config(10)).await.unwrap();
        let elapsed = started.elapsed();

        match outcome {
            PollOutcome::Included { attempts, receipt } => {
                assert_eq!(attempts, 3);
                assert_eq!(receipt.block_number, 99);
            }
            other => panic!("expected included, got {other:?}"),
        }
        assert_eq!(chain.receipt_calls(), 3);
        // two sleeps between three attempts, none after success
        assert!(elapsed >= Duration::from_secs(10), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(15), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_gives_up() {
        let hash = sample_hash(8);
        let chain = MockChain::new(100);

        let outcome = poll_receipt(&chain, &hash, &config(4)).await.unwrap();

        assert_eq!(outcome, PollOutcome::GaveUp { attempts: 4 });
        assert_eq!(chain.receipt_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_aborts_immediately() {
        let hash = sample_hash(9);
        let chain = MockChain::new(100).with_receipt_script([
            ReceiptStep::NotYet,
            ReceiptStep::Fail("503 service unavailable".into()),
            ReceiptStep::Ready,
        ]);

        let err = poll_receipt(&chain, &hash, &config(10)).await.unwrap_err();

        assert!(format!("{err:#}").contains("503 service unavailable"));
        assert_eq!(chain.receipt_calls(), 2);
    }
}
