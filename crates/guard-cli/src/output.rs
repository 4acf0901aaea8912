//! Report rendering for stdout: pretty JSON, JSON lines, or comfy tables.

use color_eyre::eyre::{Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;

use guard_analysis::{FeeVerdict, RiskReport, TxState};
use guard_data::units::{format_eth, format_gwei};

/// A batch entry that produced no report: an invalid hash or a failed lookup.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchFailure {
    /// Input as given (trimmed), or the normalized hash for lookup failures.
    pub tx_hash: String,
    /// Single-line error message.
    pub error: String,
}

/// One batch result, kept in input order.
pub type BatchOutcome = std::result::Result<RiskReport, BatchFailure>;

pub fn print_json(report: &RiskReport) -> Result<()> {
    let json_str = serde_json::to_string_pretty(report).wrap_err("failed to serialize JSON")?;
    println!("{}", json_str);
    Ok(())
}

/// One compact JSON object per batch entry, in input order.
pub fn batch_json_lines(outcomes: &[BatchOutcome]) -> Result<Vec<String>> {
    outcomes
        .iter()
        .map(|outcome| match outcome {
            Ok(report) => serde_json::to_string(report),
            Err(failure) => serde_json::to_string(failure),
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .wrap_err("failed to serialize JSON")
}

pub fn print_json_lines(outcomes: &[BatchOutcome]) -> Result<()> {
    for line in batch_json_lines(outcomes)? {
        println!("{}", line);
    }
    Ok(())
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn fee_cell(report: &RiskReport) -> String {
    match report.total_fee_wei {
        Some(total) => format!("{} ETH", format_eth(total, 8)),
        None => "-".to_string(),
    }
}

fn gas_price_cell(report: &RiskReport) -> String {
    match report.gas_price_wei {
        Some(rate) => format!("{} gwei", format_gwei(rate, 3)),
        None => "-".to_string(),
    }
}

/// Human-readable single-transaction report.
pub fn print_report(report: &RiskReport) {
    match report.state {
        TxState::NotFound => {
            println!(
                "Transaction {} not found on {}.",
                report.tx_hash, report.network
            );
            return;
        }
        TxState::GaveUp => {
            println!(
                "Gave up waiting for {} after {} attempts; still not mined.",
                report.tx_hash,
                or_dash(report.poll_attempts)
            );
            return;
        }
        TxState::Pending | TxState::Included => {}
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Field", "Value"]);

    table.add_row(vec!["Network".to_string(), report.network.clone()]);
    table.add_row(vec!["Transaction".to_string(), report.tx_hash.to_string()]);
    table.add_row(vec![
        "State".to_string(),
        if report.pending { "pending" } else { "included" }.to_string(),
    ]);
    table.add_row(vec!["From".to_string(), or_dash(report.from.as_deref())]);
    table.add_row(vec![
        "To".to_string(),
        report
            .to
            .clone()
            .unwrap_or_else(|| "(contract creation)".to_string()),
    ]);

    if !report.pending {
        table.add_row(vec!["Status".to_string(), or_dash(report.status)]);
        table.add_row(vec!["Block".to_string(), or_dash(report.block_number)]);
        table.add_row(vec![
            "Timestamp".to_string(),
            or_dash(report.timestamp_utc.as_deref()),
        ]);
        table.add_row(vec![
            "Confirmations".to_string(),
            or_dash(report.confirmations),
        ]);
        table.add_row(vec!["Gas Used".to_string(), or_dash(report.gas_used)]);
    }
    table.add_row(vec!["Gas Price".to_string(), gas_price_cell(report)]);
    if !report.pending {
        table.add_row(vec!["Total Fee".to_string(), fee_cell(report)]);
    }
    if let Some(attempts) = report.poll_attempts {
        table.add_row(vec!["Poll Attempts".to_string(), attempts.to_string()]);
    }

    if let Some(context) = &report.context {
        let stats = &context.gas_price_gwei;
        table.add_row(vec![
            "Sample Window".to_string(),
            format!(
                "{} blocks back from #{} (step {}), {} sampled, {} failed",
                context.window_blocks,
                context.head,
                context.step,
                context.sampled_blocks,
                context.failed_blocks
            ),
        ]);
        table.add_row(vec!["Samples".to_string(), stats.count.to_string()]);
        table.add_row(vec!["Median".to_string(), format!("{:.3} gwei", stats.median)]);
        table.add_row(vec!["p95".to_string(), format!("{:.3} gwei", stats.p95)]);
        table.add_row(vec![
            "Range".to_string(),
            format!("{:.3} - {:.3} gwei", stats.min, stats.max),
        ]);
    }

    println!("\n{}\n", table);

    if let Some(note) = &report.note {
        println!("Note: {note}");
    }

    match (report.classification, &report.context) {
        (Some(verdict), Some(context)) => {
            let rate = report.gas_price_gwei.unwrap_or(0.0);
            let stats = &context.gas_price_gwei;
            match verdict {
                FeeVerdict::Ok => println!("OK: gas price is within normal range."),
                FeeVerdict::HighVsMedian => println!(
                    "HIGH FEE: {:.3} gwei is above {}x the recent median ({:.3} gwei).",
                    rate, context.warn_mult_median, stats.median
                ),
                FeeVerdict::HighVsP95 => println!(
                    "HIGH FEE: {:.3} gwei is above {}x the recent p95 ({:.3} gwei).",
                    rate, context.warn_mult_p95, stats.p95
                ),
            }
        }
        _ => {
            if let Some(threshold) = report.fee_threshold_eth {
                if report.high_fee {
                    println!("HIGH FEE: total fee exceeds {threshold} ETH.");
                } else if report.total_fee_wei.is_some() {
                    println!("OK: total fee is within {threshold} ETH.");
                }
            }
        }
    }
}

/// Summary table for `batch`, followed by the reasons for any failed entries.
pub fn print_batch_table(outcomes: &[BatchOutcome], threshold_eth: f64) {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![
        "Transaction",
        "State",
        "Block",
        "Gas Price",
        "Total Fee",
        "Flag",
    ]);

    for outcome in outcomes {
        let row = match outcome {
            Ok(report) => {
                let state = match report.state {
                    TxState::Included => "included",
                    TxState::Pending => "pending",
                    TxState::NotFound => "not found",
                    TxState::GaveUp => "gave up",
                };
                vec![
                    report.tx_hash.to_string(),
                    state.to_string(),
                    or_dash(report.block_number),
                    gas_price_cell(report),
                    fee_cell(report),
                    if report.high_fee { "HIGH" } else { "" }.to_string(),
                ]
            }
            Err(failure) => vec![
                failure.tx_hash.clone(),
                "error".to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                String::new(),
            ],
        };
        table.add_row(row);
    }

    println!("\n{}\n", table);

    let inspected = outcomes.iter().filter(|o| o.is_ok()).count();
    let flagged = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(report) if report.high_fee))
        .count();
    println!(
        "Summary: {} inspected, {} above {} ETH, {} failed.",
        inspected,
        flagged,
        threshold_eth,
        outcomes.len() - inspected
    );
    for failure in outcomes.iter().filter_map(|o| o.as_ref().err()) {
        println!("  {}: {}", failure.tx_hash, failure.error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guard_analysis::report::{assemble, ChainFacts, Outcome};
    use guard_analysis::resolver::Resolution;
    use guard_data::mock::sample_hash;

    fn not_found(seed: u8) -> RiskReport {
        assemble(
            sample_hash(seed),
            Outcome::Resolved(Resolution::NotFound),
            ChainFacts::default(),
            None,
            0.0,
        )
    }

    #[test]
    fn batch_json_lines_follow_input_order() {
        let outcomes = vec![
            Ok(not_found(1)),
            Err(BatchFailure {
                tx_hash: "0xnope".to_string(),
                error: "invalid transaction hash".to_string(),
            }),
            Ok(not_found(2)),
        ];

        let lines = batch_json_lines(&outcomes).unwrap();
        let parsed: Vec<serde_json::Value> = lines
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0]["tx_hash"], sample_hash(1).to_string());
        assert_eq!(parsed[1]["tx_hash"], "0xnope");
        assert_eq!(parsed[1]["error"], "invalid transaction hash");
        assert_eq!(parsed[2]["tx_hash"], sample_hash(2).to_string());
        assert!(lines.iter().all(|line| !line.contains('\n')));
    }
}
