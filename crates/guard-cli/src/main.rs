use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use guard_analysis::report::{EXIT_HIGH_FEE, EXIT_INVALID_INPUT, EXIT_NOT_FOUND, EXIT_OK};
use guard_analysis::{
    inspect, watch, AbsoluteThreshold, ContextThresholds, FeeCheck, PollConfig, RiskReport,
    SampleWindow,
};
use guard_data::{RpcClient, TxHash};
use output::{BatchFailure, BatchOutcome};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

mod output;

#[derive(Debug, Clone)]
struct AppContext {
    rpc_url: String,
    timeout: Duration,
    json: bool,
}

#[derive(Parser, Debug)]
#[command(name = "tx-fee-guard")]
#[command(about = "Inspect EVM transaction fees against absolute and contextual risk thresholds")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Ethereum-compatible HTTP RPC endpoint.
    #[arg(long, env = "RPC_URL", global = true)]
    rpc: Option<String>,

    /// Per-request RPC timeout in seconds.
    #[arg(long, env = "FEE_GUARD_TIMEOUT", default_value_t = 15.0, global = true)]
    timeout: f64,

    /// Emit JSON instead of a human-readable report.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect one transaction against an absolute ETH fee threshold.
    Inspect(InspectArgs),
    /// Inspect many transactions against an absolute ETH fee threshold.
    Batch(BatchArgs),
    /// Compare one transaction's gas price with recent median / p95 gas prices.
    Context(ContextArgs),
    /// Poll until a transaction is mined, then check its fee.
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Transaction hash (0x + 64 hex chars).
    tx_hash: String,

    /// Warn if the total fee exceeds this value in ETH.
    #[arg(long, default_value_t = 0.05)]
    warn_fee_eth: f64,
}

/// Arguments for the `batch` subcommand.
///
/// Hashes are merged from positional args, `--file` and `--stdin`, blank
/// lines dropped and duplicates removed in first-seen order.
#[derive(Args, Debug)]
struct BatchArgs {
    /// Transaction hashes to inspect.
    tx_hashes: Vec<String>,

    /// File with one transaction hash per line.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Read additional hashes from stdin, one per line.
    #[arg(long)]
    stdin: bool,

    /// Fee threshold in ETH above which a transaction is flagged.
    #[arg(long, default_value_t = 0.01)]
    warn_fee_eth: f64,
}

#[derive(Args, Debug)]
struct ContextArgs {
    /// Transaction hash (0x + 64 hex chars).
    tx_hash: String,

    /// How many recent blocks to sample.
    #[arg(long, env = "FEE_GUARD_BLOCKS", default_value_t = 300)]
    blocks: u64,

    /// Sample every Nth block.
    #[arg(long, env = "FEE_GUARD_STEP", default_value_t = 3)]
    step: u64,

    /// Flag if gas price > median * this multiplier.
    #[arg(long, env = "FEE_GUARD_WARN_MULT_MEDIAN", default_value_t = 2.0)]
    warn_mult_median: f64,

    /// Flag if gas price > p95 * this multiplier.
    #[arg(long, env = "FEE_GUARD_WARN_MULT_P95", default_value_t = 1.2)]
    warn_mult_p95: f64,

    /// Show a progress bar while sampling blocks.
    #[arg(long)]
    progress: bool,
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// Transaction hash (0x + 64 hex chars).
    tx_hash: String,

    /// Polling interval in seconds.
    #[arg(long, default_value_t = 5.0)]
    interval: f64,

    /// Maximum polling attempts before giving up.
    #[arg(long, default_value_t = 60)]
    max_attempts: u32,

    /// Warn if the total fee exceeds this value in ETH.
    #[arg(long, default_value_t = 0.01)]
    warn_fee_eth: f64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_INVALID_INPUT)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(err) = color_eyre::install().and_then(|()| init_tracing(cli.verbose, cli.quiet)) {
        eprintln!("error: {err:#}");
        return ExitCode::from(EXIT_INVALID_INPUT);
    }

    // ctrl_c is polled first so its handler is installed before any work starts.
    tokio::select! {
        biased;
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nInterrupted by user.");
            // A pending stdin read cannot be cancelled; skip runtime shutdown.
            std::process::exit(i32::from(EXIT_INVALID_INPUT))
        }
        result = run(cli) => match result {
            Ok(code) => ExitCode::from(code),
            Err(err) => {
                eprintln!("error: {err:#}");
                ExitCode::from(EXIT_INVALID_INPUT)
            }
        },
    }
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .wrap_err("failed to initialize tracing filter")?;

    // stdout carries the report; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn run(cli: Cli) -> Result<u8> {
    let ctx = AppContext {
        rpc_url: cli
            .rpc
            .clone()
            .ok_or_else(|| eyre!("an RPC URL is required (--rpc or RPC_URL)"))?,
        timeout: parse_timeout(cli.timeout)?,
        json: cli.json,
    };

    info!(
        started_utc = %Utc::now().format("%Y-%m-%d %H:%M:%S"),
        rpc_url = %ctx.rpc_url,
        "fee guard run"
    );

    match cli.command {
        Commands::Inspect(args) => handle_inspect(&ctx, args).await,
        Commands::Batch(args) => handle_batch(&ctx, args).await,
        Commands::Context(args) => handle_context(&ctx, args).await,
        Commands::Watch(args) => handle_watch(&ctx, args).await,
    }
}

fn parse_timeout(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(eyre!("--timeout must be > 0 seconds, got {secs}"));
    }
    Duration::try_from_secs_f64(secs).wrap_err("invalid --timeout")
}

async fn connect(ctx: &AppContext) -> Result<RpcClient> {
    RpcClient::connect(&ctx.rpc_url, ctx.timeout).await
}

fn emit(ctx: &AppContext, report: &RiskReport) -> Result<u8> {
    if ctx.json {
        output::print_json(report)?;
    } else {
        output::print_report(report);
    }
    Ok(report.exit_code())
}

async fn handle_inspect(ctx: &AppContext, args: InspectArgs) -> Result<u8> {
    let hash = TxHash::parse(&args.tx_hash)?;
    let check = FeeCheck::Absolute(AbsoluteThreshold::new(args.warn_fee_eth)?);

    let client = connect(ctx).await?;
    let report = inspect(&client, hash, &check).await?;
    emit(ctx, &report)
}

async fn handle_context(ctx: &AppContext, args: ContextArgs) -> Result<u8> {
    let hash = TxHash::parse(&args.tx_hash)?;
    let check = FeeCheck::Contextual {
        window: SampleWindow::new(args.blocks, args.step)?,
        thresholds: ContextThresholds::new(args.warn_mult_median, args.warn_mult_p95)?,
        show_progress: args.progress && !ctx.json,
    };

    let client = connect(ctx).await?;
    let report = inspect(&client, hash, &check).await?;
    emit(ctx, &report)
}

async fn handle_watch(ctx: &AppContext, args: WatchArgs) -> Result<u8> {
    let hash = TxHash::parse(&args.tx_hash)?;
    let poll = PollConfig::new(args.interval, args.max_attempts)?;
    let check = FeeCheck::Absolute(AbsoluteThreshold::new(args.warn_fee_eth)?);

    let client = connect(ctx).await?;
    info!(
        tx_hash = %hash,
        interval_secs = poll.interval.as_secs_f64(),
        max_attempts = poll.max_attempts,
        warn_fee_eth = args.warn_fee_eth,
        "watching transaction"
    );
    let report = watch(&client, hash, &poll, &check).await?;
    emit(ctx, &report)
}

/// One line of batch input after normalization.
#[derive(Debug, PartialEq)]
enum BatchEntry {
    Valid(TxHash),
    Invalid { input: String, reason: String },
}

/// Merges hash sources, dropping blank lines and duplicates (first wins).
///
/// Input is read asynchronously so Ctrl-C stays responsive while waiting on
/// stdin.
async fn collect_batch_entries<R: AsyncBufRead + Unpin>(
    positional: &[String],
    file: Option<&Path>,
    stdin: Option<R>,
) -> Result<Vec<BatchEntry>> {
    let mut raw: Vec<String> = positional.to_vec();

    if let Some(path) = file {
        let content = tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("failed to read file {}", path.display()))?;
        raw.extend(content.lines().map(str::to_string));
    }

    if let Some(reader) = stdin {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.wrap_err("failed to read stdin")? {
            raw.push(line);
        }
    }

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for input in raw {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        let entry = match TxHash::parse(trimmed) {
            Ok(hash) => BatchEntry::Valid(hash),
            Err(e) => BatchEntry::Invalid {
                input: trimmed.to_string(),
                reason: e.to_string(),
            },
        };
        let key = match &entry {
            BatchEntry::Valid(hash) => hash.to_string(),
            BatchEntry::Invalid { input, .. } => input.clone(),
        };
        if seen.insert(key) {
            entries.push(entry);
        }
    }

    if entries.is_empty() {
        return Err(eyre!("no transaction hashes provided"));
    }
    Ok(entries)
}

/// Batch exit code: invalid input beats not found beats high fee.
fn batch_exit_code(codes: &[u8]) -> u8 {
    [EXIT_INVALID_INPUT, EXIT_NOT_FOUND, EXIT_HIGH_FEE]
        .into_iter()
        .find(|code| codes.contains(code))
        .unwrap_or(EXIT_OK)
}

/// Batch exit code over per-entry outcomes; failures count as invalid input.
fn batch_outcomes_exit_code(outcomes: &[BatchOutcome]) -> u8 {
    let codes: Vec<u8> = outcomes
        .iter()
        .map(|outcome| match outcome {
            Ok(report) => report.exit_code(),
            Err(_) => EXIT_INVALID_INPUT,
        })
        .collect();
    batch_exit_code(&codes)
}

async fn handle_batch(ctx: &AppContext, args: BatchArgs) -> Result<u8> {
    let threshold = AbsoluteThreshold::new(args.warn_fee_eth)?;

    let stdin = args.stdin.then(|| BufReader::new(tokio::io::stdin()));
    let entries = collect_batch_entries(&args.tx_hashes, args.file.as_deref(), stdin).await?;

    let client = connect(ctx).await?;
    let check = FeeCheck::Absolute(threshold);

    let mut outcomes: Vec<BatchOutcome> = Vec::with_capacity(entries.len());
    for entry in entries {
        let outcome = match entry {
            BatchEntry::Invalid { input, reason } => {
                tracing::warn!(input = %input, "skipping invalid transaction hash");
                Err(BatchFailure {
                    tx_hash: input,
                    error: reason,
                })
            }
            BatchEntry::Valid(hash) => inspect(&client, hash, &check).await.map_err(|e| {
                tracing::error!(tx_hash = %hash, "lookup failed: {e:#}");
                BatchFailure {
                    tx_hash: hash.to_string(),
                    error: format!("{e:#}"),
                }
            }),
        };
        outcomes.push(outcome);
    }

    if ctx.json {
        output::print_json_lines(&outcomes)?;
    } else {
        output::print_batch_table(&outcomes, threshold.threshold_eth);
    }

    let code = batch_outcomes_exit_code(&outcomes);
    info!(
        entries = outcomes.len(),
        failed = outcomes.iter().filter(|o| o.is_err()).count(),
        exit_code = code,
        "batch completed"
    );
    Ok(code)
}
