//! Wei / gwei / ether conversions.
//!
//! Amounts stay in integer Wei until the last step; the float helpers split
//! the integer into whole and fractional parts first so large totals keep
//! their precision.

/// Wei per gwei.
pub const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Wei per ether.
pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

fn to_unit_f64(wei: u128, divisor: u128) -> f64 {
    let whole = wei / divisor;
    let fractional = wei % divisor;
    whole as f64 + fractional as f64 / divisor as f64
}

/// Converts Wei to gwei for display and statistics.
pub fn wei_to_gwei(wei: u128) -> f64 {
    to_unit_f64(wei, WEI_PER_GWEI)
}

/// Converts Wei to ether.
pub fn wei_to_eth(wei: u128) -> f64 {
    to_unit_f64(wei, WEI_PER_ETH)
}

/// Total fee in Wei: `gas_used * gas_price`, exact integer product.
pub fn fee_wei(gas_used: u64, gas_price_wei: u128) -> u128 {
    (gas_used as u128).saturating_mul(gas_price_wei)
}

/// Formats Wei as ETH with a fixed number of decimals, truncating.
///
/// Examples:
/// - `format_eth(1_050_000_000_000_000, 6)` -> `"0.001050"`
/// - `format_eth(2 * WEI_PER_ETH, 2)` -> `"2.00"`
pub fn format_eth(wei: u128, decimals: u32) -> String {
    format_units(wei, WEI_PER_ETH, decimals)
}

/// Formats Wei as gwei with a fixed number of decimals, truncating.
pub fn format_gwei(wei: u128, decimals: u32) -> String {
    format_units(wei, WEI_PER_GWEI, decimals)
}

fn format_units(wei: u128, divisor: u128, decimals: u32) -> String {
    let whole = wei / divisor;
    if decimals == 0 {
        return whole.to_string();
    }

    let scale = 10u128.pow(decimals);
    let fractional = ((wei % divisor) * scale) / divisor;
    format!("{whole}.{fractional:0width$}", width = decimals as usize)
}

/// Rounds to three decimals, the precision used for gwei figures in reports.
pub fn round3(value: f64) -> f64 {
    (value * 1_000.0).round() / 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_is_exact_integer_product() {
        let total = fee_wei(21_000, 50_000_000_000);
        assert_eq!(total, 1_050_000_000_000_000);
        assert_eq!(format_eth(total, 6), "0.001050");
        assert!((wei_to_eth(total) - 0.00105).abs() < 1e-15);
    }

    #[test]
    fn gwei_conversion_keeps_fraction() {
        assert_eq!(wei_to_gwei(1_500_000_000), 1.5);
        assert_eq!(format_gwei(12_345_678_901, 3), "12.345");
        assert_eq!(format_gwei(12_345_678_901, 0), "12");
    }

    #[test]
    fn format_eth_pads_fraction() {
        assert_eq!(format_eth(123_000_000_000_000, 6), "0.000123");
        assert_eq!(format_eth(2 * WEI_PER_ETH, 2), "2.00");
    }

    #[test]
    fn round3_matches_report_precision() {
        assert_eq!(round3(12.34567), 12.346);
        assert_eq!(round3(0.0), 0.0);
    }
}
