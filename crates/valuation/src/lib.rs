#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Batch intrinsic-value screening of equities.
//!
//! This crate ties the workspace together: it re-exports the core types, the
//! extraction adapter, the valuation models and the concrete sources, and
//! adds the [`SourceRegistry`] fallback, the [`BatchRunner`] and the tabular
//! and text outputs.
//!
//! # Features
//!
//! - `yahoo` - Yahoo Finance source for quotes and point fields
//! - `fmp` - Financial Modeling Prep source, including historical series
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use valuation::{Assumptions, BatchConfig, BatchRunner, SourceRegistry, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> valuation::Result<()> {
//!     let registry = SourceRegistry::new().with_yahoo().with_fmp("your_api_key");
//!     let runner = BatchRunner::new(
//!         Arc::new(registry),
//!         Assumptions::default(),
//!         BatchConfig::default(),
//!     )?;
//!
//!     let outcome = runner.evaluate_all(&[Symbol::new("AAPL"), Symbol::new("MSFT")]).await;
//!     outcome.table().write("valuations.csv")?;
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use valuation_core::*;

// Pipeline stages
pub use valuation_extract::{Extraction, FieldExtractor};
pub use valuation_models::{
    DcfModel, ModelError, ModelOutput, ModelWarning, PeModel, RoeBreakdown, RoeModel,
    ValuationEngine, ValuationModel, apply_value_returns, value_return,
};

// Sources
#[cfg(feature = "fmp")]
pub use valuation_fmp::FmpProvider;
#[cfg(feature = "yahoo")]
pub use valuation_yahoo::YahooProvider;

mod batch;
pub use batch::{BatchConfig, BatchOutcome, BatchRunner, DEFAULT_CONCURRENCY, Omission};

mod input;
pub use input::{DEFAULT_TICKER_COLUMN, normalize_ticker, read_tickers};

mod registry;
pub use registry::SourceRegistry;

/// Per-ticker text report.
pub mod report;

mod table;
pub use table::{CSV_NULL, OutputFormat, ValuationTable};
