//! orderhist CLI: fetch, aggregate, extract, and export order history.
//!
//! Commands:
//! - `fetch`: fetch one product type (optionally one symbol) and persist artifacts
//! - `aggregate`: merge artifacts listed in a JSON task file into one report
//! - `extract`: fetch every listed symbol in parallel, then aggregate
//! - `export`: flatten a stored report to CSV
//! - `health`: liveness check
//!
//! Every command prints the task response (`{statusCode, body}`) as JSON and
//! exits non-zero when the status is not 2xx.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orderhist_core::TaskDescriptor;
use orderhist_runner::{
    credentials_from_env, export_report_csv, load_report, run_aggregate_task, run_fetch_task,
    run_health_check, write_csv, AggregateRequest, Coordinator, ExtractRequest, FetchRequest,
    PipelineConfig, TaskContext, TaskResponse,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orderhist", about = "orderhist: exchange order-history extraction")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch order history and persist per-symbol artifacts.
    Fetch {
        /// Product type (e.g., usdt-futures).
        #[arg(long)]
        product_type: String,

        /// Restrict to one symbol (e.g., BTCUSDT).
        #[arg(long)]
        symbol: Option<String>,

        /// Start of the time window, epoch milliseconds.
        #[arg(long)]
        start_time: Option<i64>,

        /// End of the time window, epoch milliseconds.
        #[arg(long)]
        end_time: Option<i64>,

        /// Page size requested from the exchange.
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Merge the artifacts listed in a JSON task file into one report.
    Aggregate {
        #[arg(long)]
        product_type: String,

        /// JSON array of `{bucket, s3Key, orders_count}` descriptors.
        #[arg(long)]
        tasks: PathBuf,
    },
    /// Fetch every symbol in parallel, then aggregate.
    Extract {
        #[arg(long)]
        product_type: String,

        /// Symbols to extract (e.g., BTCUSDT ETHUSDT).
        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// Export a stored report as CSV.
    Export {
        #[arg(long)]
        product_type: String,

        /// Output file. Prints to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Liveness check.
    Health,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("orderhist=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref()).context("failed to load config")?;

    let response = match cli.command {
        Commands::Fetch {
            product_type,
            symbol,
            start_time,
            end_time,
            limit,
        } => run_fetch(&config, product_type, symbol, start_time, end_time, limit)?,
        Commands::Aggregate {
            product_type,
            tasks,
        } => run_aggregate(&config, product_type, &tasks)?,
        Commands::Extract {
            product_type,
            symbols,
        } => run_extract(&config, product_type, symbols)?,
        Commands::Export { product_type, out } => {
            return run_export(&config, &product_type, out.as_deref())
        }
        Commands::Health => run_health_check(),
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn exchange_context(config: &PipelineConfig) -> Result<TaskContext> {
    let credentials = credentials_from_env().context("exchange credentials")?;
    Ok(TaskContext::from_config(config, credentials)?)
}

fn run_fetch(
    config: &PipelineConfig,
    product_type: String,
    symbol: Option<String>,
    start_time: Option<i64>,
    end_time: Option<i64>,
    limit: Option<u32>,
) -> Result<TaskResponse> {
    let ctx = exchange_context(config)?;

    let mut request = FetchRequest::new(product_type);
    if let Some(symbol) = symbol {
        request = request.with("symbol", symbol);
    }
    if let Some(start) = start_time {
        request = request.with("startTime", start);
    }
    if let Some(end) = end_time {
        request = request.with("endTime", end);
    }
    if let Some(limit) = limit {
        request = request.with("limit", limit);
    }

    Ok(run_fetch_task(&ctx, &request)?)
}

fn run_aggregate(
    config: &PipelineConfig,
    product_type: String,
    tasks_file: &Path,
) -> Result<TaskResponse> {
    let content = std::fs::read_to_string(tasks_file)
        .with_context(|| format!("failed to read task file {}", tasks_file.display()))?;
    let tasks: Vec<TaskDescriptor> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse task file {}", tasks_file.display()))?;

    let ctx = TaskContext::storage_only(config);
    let request = AggregateRequest {
        product_type: Some(product_type),
        tasks,
    };
    Ok(run_aggregate_task(&ctx, &request)?)
}

fn run_extract(
    config: &PipelineConfig,
    product_type: String,
    symbols: Vec<String>,
) -> Result<TaskResponse> {
    let ctx = exchange_context(config)?;
    let coordinator = Coordinator::new(ctx, config.coordinator.max_parallel_tasks);
    Ok(coordinator.start(&ExtractRequest::new(product_type, symbols)))
}

fn run_export(config: &PipelineConfig, product_type: &str, out: Option<&Path>) -> Result<()> {
    let ctx = TaskContext::storage_only(config);
    let report = load_report(ctx.store.as_ref(), &ctx.bucket, product_type)?;
    let csv = export_report_csv(&report)?;

    match out {
        Some(path) => {
            write_csv(path, &csv)?;
            eprintln!(
                "Exported {} orders across {} symbols to {}",
                report.total_orders(),
                report.symbols().len(),
                path.display()
            );
        }
        None => print!("{csv}"),
    }
    Ok(())
}
