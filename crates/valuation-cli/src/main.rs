//! The `valuation` command-line tool.

mod cli;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use valuation::{BatchRunner, SourceRegistry, Symbol, normalize_ticker, read_tickers, report};

use crate::{
    cli::Args,
    config::{FMP_API_KEY_ENV, FileConfig, Settings},
};

/// Separates the per-ticker reports.
const REPORT_SEPARATOR: &str = "---------";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(file, std::env::var(FMP_API_KEY_ENV).ok(), &args)?;
    let symbols = collect_tickers(&args)?;

    let registry = build_registry(settings.fmp_api_key.as_deref());
    info!(sources = registry.len(), models = ?settings.batch.models, "Configured");
    let runner = BatchRunner::new(Arc::new(registry), settings.assumptions, settings.batch)?;

    let outcome = runner.evaluate_all(&symbols).await;

    if args.report {
        for record in &outcome.records {
            println!("{}", report::render(record));
            println!("{REPORT_SEPARATOR}");
        }
    }

    let table = outcome.table();
    match &args.output {
        Some(path) => table
            .write(path)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", table.to_dataframe()?),
    }

    if !outcome.omissions.is_empty() {
        warn!(
            omitted = outcome.omissions.len(),
            tickers = symbols.len(),
            "Some tickers could not be evaluated"
        );
    }
    if outcome.omissions.len() == symbols.len() {
        bail!("No ticker could be evaluated");
    }
    Ok(())
}

/// Logs go to stderr so the table on stdout stays clean.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn collect_tickers(args: &Args) -> Result<Vec<Symbol>> {
    let suffix = args.strip_suffix.as_deref();
    let mut symbols: Vec<Symbol> = args
        .tickers
        .iter()
        .filter_map(|t| normalize_ticker(t, suffix))
        .collect();

    if let Some(path) = &args.file {
        let from_file = read_tickers(path, args.column.as_deref(), suffix)
            .with_context(|| format!("Failed to read tickers from {}", path.display()))?;
        symbols.extend(from_file);
    }

    if symbols.is_empty() {
        bail!("No tickers given. Pass them as arguments or with --file");
    }
    Ok(symbols)
}

fn build_registry(fmp_api_key: Option<&str>) -> SourceRegistry {
    let registry = SourceRegistry::new().with_yahoo();
    match fmp_api_key {
        Some(key) => registry.with_fmp(key),
        None => {
            warn!(
                "No {FMP_API_KEY_ENV} set: median historical P/E and 5-year ROE will be missing"
            );
            registry
        }
    }
}
