#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Field extraction adapter.
//!
//! Turns the raw strings a [`FinancialDataSource`](valuation_core::FinancialDataSource)
//! returns into a typed [`FieldSet`](valuation_core::FieldSet):
//!
//! - [`parse`] - Numeric parsing with separator stripping and unit scaling
//! - [`history`] - Median historical P/E and windowed ROE averaging
//! - [`FieldExtractor`] - Concurrent, failure-isolated per-field fetching

/// Per-ticker extraction.
pub mod extractor;
/// Historical series aggregation.
pub mod history;
/// Numeric parsing of scraped strings.
pub mod parse;

pub use extractor::{Extraction, FieldExtractor};
