//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use valuation::Model;

/// Value equities under the P/E, DCF and ROE models.
#[derive(Parser, Debug)]
#[command(name = "valuation")]
#[command(version, about, long_about = None)]
pub(crate) struct Args {
    /// Tickers to evaluate
    pub(crate) tickers: Vec<String>,

    /// File with more tickers (.csv, or one ticker per line)
    #[arg(short, long)]
    pub(crate) file: Option<PathBuf>,

    /// Ticker column of a CSV ticker file
    #[arg(long)]
    pub(crate) column: Option<String>,

    /// Exchange suffix removed from every ticker, e.g. " US"
    #[arg(long)]
    pub(crate) strip_suffix: Option<String>,

    /// TOML settings file
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,

    /// Write the table here (.csv or .parquet) instead of printing it
    #[arg(short, long)]
    pub(crate) output: Option<PathBuf>,

    /// Models to compute
    #[arg(short, long, value_delimiter = ',')]
    pub(crate) models: Option<Vec<Model>>,

    /// Fraction cut from growth estimates
    #[arg(long)]
    pub(crate) margin_of_safety: Option<f64>,

    /// Annual discount rate
    #[arg(long)]
    pub(crate) discount_rate: Option<f64>,

    /// Per-year decay of growth in the DCF projection
    #[arg(long)]
    pub(crate) growth_decay_rate: Option<f64>,

    /// Multiple of the final discounted cash flow used as terminal value
    #[arg(long)]
    pub(crate) terminal_multiplier: Option<f64>,

    /// Seconds allowed per ticker
    #[arg(short, long)]
    pub(crate) timeout: Option<f64>,

    /// Tickers evaluated at once
    #[arg(long)]
    pub(crate) concurrency: Option<usize>,

    /// Financial Modeling Prep API key (defaults to $FMP_API_KEY)
    #[arg(long)]
    pub(crate) fmp_api_key: Option<String>,

    /// Print the per-ticker text report
    #[arg(short, long, default_value_t = false)]
    pub(crate) report: bool,

    /// Debug logging
    #[arg(short, long, default_value_t = false)]
    pub(crate) verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from([
            "valuation",
            "aapl",
            "msft",
            "--models",
            "pe,dcf",
            "--discount-rate",
            "0.09",
            "--timeout",
            "30",
            "--report",
        ]);

        assert_eq!(args.tickers, vec!["aapl", "msft"]);
        assert_eq!(args.models, Some(vec![Model::Pe, Model::Dcf]));
        assert_eq!(args.discount_rate, Some(0.09));
        assert_eq!(args.timeout, Some(30.0));
        assert!(args.report);
        assert!(!args.verbose);
        assert_eq!(args.margin_of_safety, None);
    }

    #[test]
    fn test_unknown_model_rejected() {
        let result = Args::try_parse_from(["valuation", "AAPL", "--models", "graham"]);
        assert!(result.is_err());
    }
}
