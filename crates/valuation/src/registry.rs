//! Source registry for combining several data sources with fallback behavior.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use valuation_core::{
    DataProvider, Field, FinancialDataSource, HistoricalMetric, Quote, RawField, RawSeries,
    Result, Symbol, ValuationError,
};

/// Registry of data sources queried in registration order.
///
/// Every request goes to the sources that support it, one after another,
/// until one has a value. A source that errors or has nothing is skipped.
/// The registry is itself a [`FinancialDataSource`], so the extractor does not
/// know whether it talks to one source or several.
///
/// # Example
///
/// ```rust,ignore
/// use valuation::{SourceRegistry, Symbol, FinancialDataSource};
///
/// let registry = SourceRegistry::new()
///     .with_yahoo()
///     .with_fmp("your_api_key");
///
/// let quote = registry.fetch_quote(&Symbol::new("AAPL")).await?;
/// ```
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn FinancialDataSource>>,
    fields: Vec<Field>,
    series: Vec<HistoricalMetric>,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl SourceRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source after the ones already registered.
    pub fn register(&mut self, source: Arc<dyn FinancialDataSource>) {
        debug!(
            provider = source.name(),
            description = source.description(),
            "Registering source"
        );
        for field in source.supported_fields() {
            if !self.fields.contains(field) {
                self.fields.push(*field);
            }
        }
        for metric in source.supported_series() {
            if !self.series.contains(metric) {
                self.series.push(*metric);
            }
        }
        self.sources.push(source);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn FinancialDataSource>) -> Self {
        self.register(source);
        self
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if no source is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Try `fetch` on each candidate until one returns a value.
    ///
    /// Returns `Ok(None)` if at least one candidate answered without a value,
    /// and the last error if every candidate failed. With no candidate at all
    /// the request is [`ValuationError::NotSupported`], which callers tell
    /// apart from a failed request.
    async fn first_available<'f, T, F>(
        &self,
        what: &str,
        symbol: &Symbol,
        candidates: impl Iterator<Item = &'f Arc<dyn FinancialDataSource>>,
        fetch: F,
    ) -> Result<Option<T>>
    where
        F: Fn(&'f Arc<dyn FinancialDataSource>) -> BoxFuture<'f, Result<Option<T>>>,
    {
        if self.sources.is_empty() {
            return Err(ValuationError::ProviderNotConfigured(
                "No sources registered".to_string(),
            ));
        }

        let mut tried = false;
        let mut answered = false;
        let mut last_error = None;
        for source in candidates {
            tried = true;
            debug!(provider = source.name(), symbol = %symbol, what, "Fetching");

            match fetch(source).await {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => {
                    debug!(provider = source.name(), what, "Source has no value, trying next");
                    answered = true;
                }
                Err(ValuationError::NotSupported(reason)) => {
                    debug!(provider = source.name(), what, %reason, "Not supported, trying next");
                    if last_error.is_none() {
                        last_error = Some(ValuationError::NotSupported(reason));
                    }
                }
                Err(e) => {
                    warn!(
                        provider = source.name(),
                        what,
                        error = %e,
                        "Source failed, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }

        if !tried {
            debug!(symbol = %symbol, what, "No registered source provides this");
            return Err(ValuationError::NotSupported(format!(
                "No registered source provides {what}"
            )));
        }

        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(None),
        }
    }

    // Builder methods for easy setup with specific sources

    /// Add the Yahoo Finance source.
    #[cfg(feature = "yahoo")]
    #[must_use]
    pub fn with_yahoo(self) -> Self {
        self.with_source(Arc::new(valuation_yahoo::YahooProvider::new()))
    }

    /// Add the Financial Modeling Prep source.
    #[cfg(feature = "fmp")]
    #[must_use]
    pub fn with_fmp(self, api_key: &str) -> Self {
        self.with_source(Arc::new(valuation_fmp::FmpProvider::new(api_key)))
    }
}

impl DataProvider for SourceRegistry {
    fn name(&self) -> &str {
        "Source registry"
    }

    fn description(&self) -> &str {
        "Ordered fallback over the registered sources"
    }

    fn supported_fields(&self) -> &[Field] {
        &self.fields
    }

    fn supported_series(&self) -> &[HistoricalMetric] {
        &self.series
    }
}

#[async_trait]
impl FinancialDataSource for SourceRegistry {
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Option<Quote>> {
        self.first_available("quote", symbol, self.sources.iter(), |s| {
            s.fetch_quote(symbol)
        })
        .await
    }

    async fn fetch_field(&self, symbol: &Symbol, field: Field) -> Result<Option<RawField>> {
        let candidates = self
            .sources
            .iter()
            .filter(|s| s.supported_fields().contains(&field));
        self.first_available(field.column(), symbol, candidates, |s| {
            s.fetch_field(symbol, field)
        })
        .await
    }

    async fn fetch_historical_series(
        &self,
        symbol: &Symbol,
        metric: HistoricalMetric,
    ) -> Result<Option<RawSeries>> {
        let candidates = self
            .sources
            .iter()
            .filter(|s| s.supported_series().contains(&metric));
        self.first_available(metric.name(), symbol, candidates, |s| {
            s.fetch_historical_series(symbol, metric)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use valuation_core::InMemorySource;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    #[tokio::test]
    async fn test_empty_registry_not_configured() {
        let registry = SourceRegistry::new();
        let result = registry.fetch_quote(&Symbol::new("AAPL")).await;
        assert!(matches!(
            result,
            Err(ValuationError::ProviderNotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_falls_back_to_next_source() {
        let primary = InMemorySource::new().with_field("ACME", Field::Eps, RawField::new("1.0"));
        let secondary = InMemorySource::new()
            .with_quote("ACME", Quote::new(20.0, date()))
            .with_field("ACME", Field::Eps, RawField::new("9.9"))
            .with_field("ACME", Field::FreeCashFlow, RawField::new("500"));

        let registry = SourceRegistry::new()
            .with_source(Arc::new(primary))
            .with_source(Arc::new(secondary));
        let symbol = Symbol::new("ACME");

        assert_eq!(
            registry.fetch_field(&symbol, Field::Eps).await.unwrap(),
            Some(RawField::new("1.0"))
        );
        assert_eq!(
            registry
                .fetch_field(&symbol, Field::FreeCashFlow)
                .await
                .unwrap(),
            Some(RawField::new("500"))
        );
        assert_eq!(
            registry.fetch_quote(&symbol).await.unwrap(),
            Some(Quote::new(20.0, date()))
        );
    }

    #[tokio::test]
    async fn test_failing_source_is_skipped() {
        let down = InMemorySource::new().with_symbol("ACME").with_unreachable("ACME");
        let up = InMemorySource::new().with_quote("ACME", Quote::new(20.0, date()));

        let registry = SourceRegistry::new()
            .with_source(Arc::new(down))
            .with_source(Arc::new(up));

        let quote = registry.fetch_quote(&Symbol::new("ACME")).await.unwrap();
        assert_eq!(quote, Some(Quote::new(20.0, date())));
    }

    #[tokio::test]
    async fn test_all_failing_returns_last_error() {
        let registry = SourceRegistry::new()
            .with_source(Arc::new(InMemorySource::new()))
            .with_source(Arc::new(
                InMemorySource::new().with_symbol("ACME").with_unreachable("ACME"),
            ));

        let result = registry.fetch_quote(&Symbol::new("ACME")).await;
        assert!(matches!(result, Err(ValuationError::Network(_))));
    }

    #[tokio::test]
    async fn test_answered_without_value_is_none() {
        let registry = SourceRegistry::new()
            .with_source(Arc::new(InMemorySource::new().with_symbol("ACME")))
            .with_source(Arc::new(
                InMemorySource::new().with_symbol("ACME").with_unreachable("ACME"),
            ));

        let series = registry
            .fetch_historical_series(&Symbol::new("ACME"), HistoricalMetric::PriceEarnings)
            .await
            .unwrap();
        assert_eq!(series, None);
    }

    #[tokio::test]
    async fn test_no_candidate_is_not_supported() {
        let registry = SourceRegistry::new().with_source(Arc::new(
            InMemorySource::new()
                .with_symbol("ACME")
                .with_unreachable("ACME")
                .without_series(),
        ));

        let series = registry
            .fetch_historical_series(&Symbol::new("ACME"), HistoricalMetric::ReturnOnEquity)
            .await;
        assert!(matches!(series, Err(ValuationError::NotSupported(_))));

        let field = registry.fetch_field(&Symbol::new("ACME"), Field::Eps).await;
        assert!(matches!(field, Err(ValuationError::Network(_))));
    }

    #[test]
    fn test_debug_lists_sources() {
        let registry = SourceRegistry::new().with_source(Arc::new(InMemorySource::new()));
        let debug = format!("{registry:?}");
        assert!(debug.contains("In-Memory"));
        assert_eq!(registry.len(), 1);
    }
}
