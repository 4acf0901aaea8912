//! Shared test helpers and utilities.
//!
//! Builds in-memory chains with a recent-gas-price history so the fee guard
//! pipelines can run end to end without a node.

#![allow(dead_code)]

use guard_analysis::{AbsoluteThreshold, ContextThresholds, FeeCheck, SampleWindow};
use guard_data::mock::{sample_receipt, sample_transaction, MockChain};
use guard_data::TxHash;

pub const GWEI: u128 = 1_000_000_000;

/// Chain head used by every fixture.
pub const HEAD: u64 = 19_000_000;

/// Chain whose last `blocks` blocks each carry one transaction per entry in
/// `prices_gwei`.
///
/// # Example
/// ```ignore
/// let chain = chain_with_history(10, &[10, 20]);
/// ```
pub fn chain_with_history(blocks: u64, prices_gwei: &[u128]) -> MockChain {
    let wei: Vec<u128> = prices_gwei.iter().map(|p| p * GWEI).collect();
    (0..blocks).fold(MockChain::new(HEAD), |chain, offset| {
        chain.with_block(HEAD - offset, &wei)
    })
}

/// Adds a mined transaction at `block` with the given effective rate.
pub fn with_mined(chain: MockChain, hash: TxHash, block: u64, effective_gwei: u128) -> MockChain {
    chain
        .with_transaction(sample_transaction(hash, Some(block), effective_gwei * GWEI))
        .with_receipt(hash, sample_receipt(block, Some(effective_gwei * GWEI)))
}

/// Contextual check over the last `blocks` blocks at step 1 with default
/// multipliers.
pub fn contextual(blocks: u64) -> FeeCheck {
    FeeCheck::Contextual {
        window: SampleWindow::new(blocks, 1).expect("valid window"),
        thresholds: ContextThresholds::DEFAULT,
        show_progress: false,
    }
}

/// Absolute check at `threshold_eth`.
pub fn absolute(threshold_eth: f64) -> FeeCheck {
    FeeCheck::Absolute(AbsoluteThreshold::new(threshold_eth).expect("valid threshold"))
}
