//! Summary statistics over gas price samples.

use serde::Serialize;

use guard_data::units::round3;

/// Returns the q-th percentile (q in 0..=1) using nearest-rank selection.
///
/// The sample is sorted ascending and the element at `round(q * (n - 1))`
/// is returned; there is no interpolation between neighbours. `q` is clamped
/// into range and an empty sample yields `0.0`.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, q)
}

fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let q = if q.is_nan() { 0.0 } else { q.clamp(0.0, 1.0) };
    let idx = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn median_sorted(sorted: &[f64]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// Gas price statistics in gwei.
///
/// All fields are zero when the sample is empty; classifiers treat that as
/// "no context".
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct GasPriceStats {
    /// Median (mean of the two middle values for even counts). Not the
    /// nearest-rank `percentile(_, 0.5)`, which picks an element.
    pub median: f64,
    /// 95th percentile, nearest rank.
    pub p95: f64,
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
    /// Number of samples.
    pub count: usize,
}

impl GasPriceStats {
    /// Computes statistics from unsorted gwei samples.
    pub fn from_samples(samples: &[f64]) -> Self {
        let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return Self::default();
        }
        sorted.sort_by(f64::total_cmp);

        Self {
            median: median_sorted(&sorted),
            p95: percentile_sorted(&sorted, 0.95),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            count: sorted.len(),
        }
    }

    /// True when there is nothing to compare against.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Copy rounded to three decimals for output.
    pub fn rounded(&self) -> Self {
        Self {
            median: round3(self.median),
            p95: round3(self.p95),
            min: round3(self.min),
            max: round3(self.max),
            count: self.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_to_ten() -> Vec<f64> {
        (1..=10).map(f64::from).collect()
    }

    #[test]
    fn percentile_uses_nearest_rank() {
        let values = one_to_ten();
        // round(0.5 * 9) = round(4.5) = 5 -> 6
        assert_eq!(percentile(&values, 0.5), 6.0);
        // round(0.95 * 9) = round(8.55) = 9 -> 10
        assert_eq!(percentile(&values, 0.95), 10.0);
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 1.0), 10.0);
    }

    #[test]
    fn percentile_sorts_input_and_clamps_q() {
        let values = vec![10.0, 3.0, 7.0, 1.0];
        assert_eq!(percentile(&values, -1.0), 1.0);
        assert_eq!(percentile(&values, 2.0), 10.0);
        assert_eq!(percentile(&values, 0.5), 7.0);
    }

    #[test]
    fn percentile_of_empty_is_zero() {
        assert_eq!(percentile(&[], 0.95), 0.0);
    }

    #[test]
    fn stats_over_sample() {
        let stats = GasPriceStats::from_samples(&[5.0, 1.0, 3.0, 9.0]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.median, 4.0);
        // round(0.95 * 3) = 3
        assert_eq!(stats.p95, 9.0);
    }

    #[test]
    fn median_differs_from_nearest_rank_midpoint() {
        let values = one_to_ten();
        let stats = GasPriceStats::from_samples(&values);
        assert_eq!(stats.median, 5.5);
        assert_eq!(percentile(&values, 0.5), 6.0);

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["median"], 5.5);
        assert!(json.get("p50").is_none());
    }

    #[test]
    fn stats_of_empty_sample_are_zero() {
        let stats = GasPriceStats::from_samples(&[]);
        assert_eq!(stats, GasPriceStats::default());
        assert!(stats.is_empty());
    }

    #[test]
    fn rounded_keeps_count() {
        let stats = GasPriceStats::from_samples(&[1.23456, 2.34567]).rounded();
        assert_eq!(stats.min, 1.235);
        assert_eq!(stats.max, 2.346);
        assert_eq!(stats.count, 2);
    }
}
