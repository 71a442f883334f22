//! In-memory data source.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::{
    error::{Result, ValuationError},
    source::{DataProvider, FinancialDataSource},
    types::{Field, HistoricalMetric, Quote, RawField, RawSeries, Symbol},
};

/// Everything known about one symbol.
#[derive(Debug, Clone, Default)]
struct SymbolData {
    quote: Option<Quote>,
    fields: HashMap<Field, RawField>,
    series: HashMap<HistoricalMetric, RawSeries>,
}

/// Simple in-memory source for tests, fixtures and offline runs.
///
/// Symbols that were never seeded are reported as not found. Symbols marked
/// unreachable fail every request with a network error, and a per-symbol
/// latency can be injected to exercise timeouts.
#[derive(Debug, Default)]
pub struct InMemorySource {
    symbols: RwLock<HashMap<Symbol, SymbolData>>,
    unreachable: RwLock<HashSet<Symbol>>,
    latency: RwLock<HashMap<Symbol, Duration>>,
    point_only: bool,
}

const ALL_SERIES: [HistoricalMetric; 2] = [
    HistoricalMetric::PriceEarnings,
    HistoricalMetric::ReturnOnEquity,
];

impl InMemorySource {
    /// Create a new empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a symbol with no data.
    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<Symbol>) -> Self {
        self.symbols.get_mut().entry(symbol.into()).or_default();
        self
    }

    /// Sets the quote of a symbol.
    #[must_use]
    pub fn with_quote(mut self, symbol: impl Into<Symbol>, quote: Quote) -> Self {
        self.symbols.get_mut().entry(symbol.into()).or_default().quote = Some(quote);
        self
    }

    /// Sets the raw text of one point field.
    #[must_use]
    pub fn with_field(mut self, symbol: impl Into<Symbol>, field: Field, raw: RawField) -> Self {
        self.symbols
            .get_mut()
            .entry(symbol.into())
            .or_default()
            .fields
            .insert(field, raw);
        self
    }

    /// Sets a historical series.
    #[must_use]
    pub fn with_series(
        mut self,
        symbol: impl Into<Symbol>,
        metric: HistoricalMetric,
        series: RawSeries,
    ) -> Self {
        self.symbols
            .get_mut()
            .entry(symbol.into())
            .or_default()
            .series
            .insert(metric, series);
        self
    }

    /// Makes every request for a symbol fail with a network error.
    #[must_use]
    pub fn with_unreachable(mut self, symbol: impl Into<Symbol>) -> Self {
        self.unreachable.get_mut().insert(symbol.into());
        self
    }

    /// Delays every request for a symbol.
    #[must_use]
    pub fn with_latency(mut self, symbol: impl Into<Symbol>, latency: Duration) -> Self {
        self.latency.get_mut().insert(symbol.into(), latency);
        self
    }

    /// Serves no historical series, like a source that only has the quote and
    /// point fields. Series requests fail with [`ValuationError::NotSupported`].
    #[must_use]
    pub fn without_series(mut self) -> Self {
        self.point_only = true;
        self
    }

    /// Applies injected latency and failures, then reads the symbol's data.
    async fn lookup<T>(&self, symbol: &Symbol, read: impl FnOnce(&SymbolData) -> T) -> Result<T> {
        let latency = self.latency.read().await.get(symbol).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.unreachable.read().await.contains(symbol) {
            return Err(ValuationError::Network(format!(
                "connection refused for {symbol}"
            )));
        }

        let symbols = self.symbols.read().await;
        match symbols.get(symbol) {
            Some(data) => Ok(read(data)),
            None => Err(ValuationError::SymbolNotFound(symbol.to_string())),
        }
    }
}

impl DataProvider for InMemorySource {
    fn name(&self) -> &str {
        "In-Memory"
    }

    fn description(&self) -> &str {
        "In-memory data source for tests and offline runs"
    }

    fn supported_fields(&self) -> &[Field] {
        &Field::ALL
    }

    fn supported_series(&self) -> &[HistoricalMetric] {
        if self.point_only { &[] } else { &ALL_SERIES }
    }
}

#[async_trait]
impl FinancialDataSource for InMemorySource {
    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Option<Quote>> {
        let quote = self.lookup(symbol, |data| data.quote.clone()).await?;
        debug!(found = quote.is_some(), "Quote lookup");
        Ok(quote)
    }

    #[instrument(skip(self), fields(symbol = %symbol, field = ?field))]
    async fn fetch_field(&self, symbol: &Symbol, field: Field) -> Result<Option<RawField>> {
        let raw = self
            .lookup(symbol, |data| data.fields.get(&field).cloned())
            .await?;
        debug!(found = raw.is_some(), "Field lookup");
        Ok(raw)
    }

    #[instrument(skip(self), fields(symbol = %symbol, metric = %metric))]
    async fn fetch_historical_series(
        &self,
        symbol: &Symbol,
        metric: HistoricalMetric,
    ) -> Result<Option<RawSeries>> {
        if self.point_only {
            return Err(ValuationError::NotSupported(format!(
                "{metric} series from {}",
                self.name()
            )));
        }

        let series = self
            .lookup(symbol, |data| data.series.get(&metric).cloned())
            .await?;
        debug!(found = series.is_some(), "Series lookup");
        Ok(series)
    }
}
