//! Source traits for fetching the raw inputs of a valuation.
//!
//! This module defines the boundary between the valuation engine and whatever
//! produces its data:
//!
//! - [`DataProvider`] - Base trait with provider metadata
//! - [`FinancialDataSource`] - Quote, point fields and historical series
//!
//! Sources return raw strings; parsing and aggregation belong to the extractor.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{Field, HistoricalMetric, Quote, RawField, RawSeries, Symbol},
};

/// Base trait for all data providers.
///
/// All data providers must implement this trait to provide basic metadata
/// about the provider and its capabilities.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "Yahoo Finance").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;

    /// Returns the point fields this provider can answer with `fetch_field`.
    fn supported_fields(&self) -> &[Field];

    /// Returns the historical series this provider can answer.
    fn supported_series(&self) -> &[HistoricalMetric];
}

/// Provider of the raw financial data a valuation needs.
///
/// Every method distinguishes three outcomes:
///
/// * `Ok(Some(_))` - the source has a value
/// * `Ok(None)` - the source answered but has nothing for this request
/// * `Err(_)` - the request failed (network, unknown symbol, unsupported)
///
/// Implementations must be safe for concurrent use; the batch runner shares one
/// source across all in-flight tickers.
#[async_trait]
pub trait FinancialDataSource: DataProvider {
    /// Fetches the current price of a symbol.
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Option<Quote>>;

    /// Fetches the raw text of one point field.
    ///
    /// Series-derived fields ([`Field::MedianHistoricalPe`], [`Field::ReturnOnEquity5y`])
    /// are requested through [`fetch_historical_series`](Self::fetch_historical_series).
    async fn fetch_field(&self, symbol: &Symbol, field: Field) -> Result<Option<RawField>>;

    /// Fetches a historical series ordered oldest to newest, where the newest
    /// entry is the current (trailing) period.
    async fn fetch_historical_series(
        &self,
        symbol: &Symbol,
        metric: HistoricalMetric,
    ) -> Result<Option<RawSeries>>;
}
