//! Market data fetcher CLI
//!
//! Materializes the subset of a historical candle data repository that
//! matches the configured exchanges, trading modes and timeframes, using
//! git's blobless sparse checkout transport. Built for CI jobs that need
//! backtesting data without downloading the whole repository.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use market_data_fetcher::{
    DataFetcher, DataSummary, FetchConfig, FetchError, FetchOutcome, FetchReport, PatternPlan,
    SystemGit, DEFAULT_DATA_DIR, DEFAULT_REPO_URL,
};

#[derive(Parser, Debug)]
#[command(name = "market-data-fetcher")]
#[command(about = "Fetch historical market data via git sparse checkout", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reset the data directory and materialize the configured data files
    Fetch(FetchArgs),
    /// Print the derived sparse checkout patterns without touching disk
    Plan(SelectionArgs),
    /// Summarize the feather files in an existing data directory
    Status {
        /// Data directory to inspect
        #[arg(long, env = "DATA_DIR", default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
    },
}

#[derive(Args, Debug)]
struct FetchArgs {
    #[command(flatten)]
    selection: SelectionArgs,

    /// Write a JSON run report to this path (outside the data directory)
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SelectionArgs {
    /// Exchanges to fetch, whitespace-separated (e.g. "binance kucoin")
    #[arg(long, env = "EXCHANGE")]
    exchange: String,

    /// Trading modes to fetch, "spot", "futures" or both
    #[arg(long, env = "TRADING_MODE")]
    trading_mode: String,

    /// Timeframes the strategy trades on, whitespace-separated (e.g. "5m")
    #[arg(long, env = "TIMEFRAME")]
    timeframe: String,

    /// Additional informative timeframes (e.g. "15m 1h 4h 1d")
    #[arg(long, env = "HELPER_TIME_FRAMES", default_value = "")]
    helper_time_frames: String,

    /// Remote data repository URL
    #[arg(long, env = "DATA_REPO_URL", default_value = DEFAULT_REPO_URL)]
    repo_url: String,

    /// Clone target directory
    #[arg(long, env = "DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
}

impl SelectionArgs {
    fn into_config(self) -> Result<FetchConfig, FetchError> {
        FetchConfig::from_lists(
            &self.exchange,
            &self.trading_mode,
            &self.timeframe,
            &self.helper_time_frames,
            self.repo_url,
            self.data_dir,
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Fetch(args) => run_fetch(args).await,
        Commands::Plan(selection) => run_plan(selection),
        Commands::Status { data_dir } => run_status(&data_dir),
    }
}

async fn run_fetch(args: FetchArgs) -> Result<()> {
    let config = load_config(args.selection);
    info!(
        "Fetching {:?} {:?} data for {:?}",
        config.trading_modes, config.timeframes, config.exchanges
    );

    let fetcher = DataFetcher::new(&config, SystemGit::new());
    let outcome = match fetcher.fetch().await {
        Ok(outcome) => outcome,
        Err(e) => fail(&e),
    };

    let summary = match DataSummary::scan(&config.data_dir) {
        Ok(summary) => summary,
        Err(e) => fail(&e),
    };
    info!(
        "Materialized {} feather files ({}) in {}",
        summary.total_files,
        format_size(summary.total_bytes),
        config.data_dir.display()
    );

    if let Some(path) = &args.report {
        write_report(path, &config, &outcome, &summary)?;
    }
    Ok(())
}

fn run_plan(selection: SelectionArgs) -> Result<()> {
    let config = load_config(selection);
    let plan = PatternPlan::derive(&config);
    for pattern in plan.iter() {
        println!("{}", pattern);
    }
    Ok(())
}

fn run_status(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        println!("Data directory does not exist: {}", data_dir.display());
        return Ok(());
    }
    let summary = match DataSummary::scan(data_dir) {
        Ok(summary) => summary,
        Err(e) => fail(&e),
    };
    if summary.total_files == 0 {
        println!("No feather files in {}", data_dir.display());
        return Ok(());
    }
    print_summary(data_dir, &summary);
    Ok(())
}

fn load_config(selection: SelectionArgs) -> FetchConfig {
    match selection.into_config() {
        Ok(config) => config,
        Err(e) => fail(&e),
    }
}

fn write_report(
    path: &Path,
    config: &FetchConfig,
    outcome: &FetchOutcome,
    summary: &DataSummary,
) -> Result<()> {
    if path.starts_with(&config.data_dir) {
        warn!(
            "Report path {} is inside the data directory and will be removed by the next fetch",
            path.display()
        );
    }
    let report = FetchReport::new(config, outcome.patterns_registered(), summary);
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
    fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!("Run report written to {}", path.display());
    Ok(())
}

fn print_summary(data_dir: &Path, summary: &DataSummary) {
    println!("Data directory: {}", data_dir.display());
    println!();
    println!("  {:<32} {:>8} {:>12}", "MARKET", "FILES", "SIZE");
    for market in &summary.markets {
        println!(
            "  {:<32} {:>8} {:>12}",
            market.market,
            market.files,
            format_size(market.bytes)
        );
    }
    println!();
    println!(
        "  {} files, {} total",
        summary.total_files,
        format_size(summary.total_bytes)
    );
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn fail(err: &FetchError) -> ! {
    error!("{}", err);
    std::process::exit(err.exit_code());
}
