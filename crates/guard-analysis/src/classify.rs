//! Fee risk classifiers.
//!
//! Two alternative strategies: a contextual one comparing a fee rate with
//! recent median / p95 gas prices, and an absolute one comparing the total
//! fee with a fixed ETH threshold. Callers pick one per run.

use std::fmt;

use eyre::{eyre, Result};
use serde::Serialize;

use guard_data::units::wei_to_eth;

/// Verdict of the contextual classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeVerdict {
    /// Within contextual bounds.
    Ok,
    /// Above `median * median_multiplier`.
    HighVsMedian,
    /// Above `p95 * p95_multiplier`.
    HighVsP95,
}

impl FeeVerdict {
    /// True for either "high" verdict.
    pub fn is_high(&self) -> bool {
        !matches!(self, Self::Ok)
    }
}

impl fmt::Display for FeeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::HighVsMedian => write!(f, "high_vs_median"),
            Self::HighVsP95 => write!(f, "high_vs_p95"),
        }
    }
}

/// Multipliers for the contextual classifier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ContextThresholds {
    /// Flag when rate exceeds `median * median_multiplier`.
    pub median_multiplier: f64,
    /// Flag when rate exceeds `p95 * p95_multiplier`.
    pub p95_multiplier: f64,
}

impl ContextThresholds {
    /// Defaults: median x2.0, p95 x1.2.
    pub const DEFAULT: Self = Self {
        median_multiplier: 2.0,
        p95_multiplier: 1.2,
    };

    /// # Errors
    /// Returns error if either multiplier is negative or not finite.
    pub fn new(median_multiplier: f64, p95_multiplier: f64) -> Result<Self> {
        for (name, value) in [
            ("--warn-mult-median", median_multiplier),
            ("--warn-mult-p95", p95_multiplier),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(eyre!("{name} must be a non-negative number, got {value}"));
            }
        }
        Ok(Self {
            median_multiplier,
            p95_multiplier,
        })
    }
}

impl Default for ContextThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Classifies a fee rate against recent median and p95 rates (same unit).
///
/// The median check runs first and short-circuits: a rate that trips both
/// checks is reported as [`FeeVerdict::HighVsMedian`]. Non-positive context
/// statistics mean there is no usable sample and always yield
/// [`FeeVerdict::Ok`].
pub fn classify_contextual(
    target_rate: f64,
    median: f64,
    p95: f64,
    thresholds: &ContextThresholds,
) -> FeeVerdict {
    if median <= 0.0 || p95 <= 0.0 {
        return FeeVerdict::Ok;
    }

    if target_rate > median * thresholds.median_multiplier {
        return FeeVerdict::HighVsMedian;
    }
    if target_rate > p95 * thresholds.p95_multiplier {
        return FeeVerdict::HighVsP95;
    }
    FeeVerdict::Ok
}

/// Fixed total-fee threshold in ETH.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AbsoluteThreshold {
    /// Threshold in ETH.
    pub threshold_eth: f64,
}

impl AbsoluteThreshold {
    /// # Errors
    /// Returns error if the threshold is negative or not finite.
    pub fn new(threshold_eth: f64) -> Result<Self> {
        if !threshold_eth.is_finite() || threshold_eth < 0.0 {
            return Err(eyre!(
                "--warn-fee-eth must be non-negative, got {threshold_eth}"
            ));
        }
        Ok(Self { threshold_eth })
    }

    /// True when the total fee exceeds the threshold.
    pub fn is_high_fee(&self, total_fee_wei: u128) -> bool {
        wei_to_eth(total_fee_wei) > self.threshold_eth
    }
}

/// Which classifier a run uses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FeeCheck {
    /// Compare total fee with a fixed ETH threshold.
    Absolute(AbsoluteThreshold),
    /// Compare fee rate with a sampled block window.
    Contextual {
        /// Sampling window.
        window: crate::sampler::SampleWindow,
        /// Multipliers.
        thresholds: ContextThresholds,
        /// Draw a progress bar while sampling.
        show_progress: bool,
    },
}
