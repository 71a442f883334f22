#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the equity valuation engine.
//!
//! This crate provides the foundational abstractions shared by every other crate:
//!
//! - [`FinancialDataSource`](source::FinancialDataSource) - The data source boundary
//! - [`ValuationRecord`](record::ValuationRecord) - Per-ticker fields, valuations and returns
//! - [`FieldSet`](types::FieldSet) - Typed presence/absence of the ten recognized fields
//! - [`Assumptions`](config::Assumptions) - Model parameters with validation
//! - [`InMemorySource`](memory::InMemorySource) - Deterministic source for tests

/// Model assumptions and their validation.
pub mod config;
/// Error types for valuation operations.
pub mod error;
/// In-memory data source.
pub mod memory;
/// The per-ticker valuation record.
pub mod record;
/// Source traits for fetching raw data.
pub mod source;
/// Request pacing and response sharing.
pub mod throttle;
/// Core data types (Symbol, Quote, Field, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use config::Assumptions;
pub use error::{Result, ValuationError};
pub use memory::InMemorySource;
pub use record::{RecordNote, ValuationRecord};
pub use source::{DataProvider, FinancialDataSource};
pub use throttle::{DEFAULT_RESPONSE_TTL, RateLimiter, ResponseMemo};
pub use types::{
    Field, FieldOrigin, FieldSet, FieldValue, HistoricalMetric, MissingReason, Model, Quote,
    RawField, RawSeries, Symbol,
};
