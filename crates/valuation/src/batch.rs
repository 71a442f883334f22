//! Batch evaluation of many tickers with bounded parallelism.

use std::{fmt, sync::Arc, time::Duration};

use chrono::{NaiveDate, Utc};
use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use valuation_core::{
    Assumptions, FinancialDataSource, Model, Result, Symbol, ValuationError, ValuationRecord,
};
use valuation_extract::FieldExtractor;
use valuation_models::ValuationEngine;

use crate::table::ValuationTable;

/// Default number of tickers evaluated at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Batch settings that are not valuation assumptions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of tickers in flight. `1` evaluates sequentially.
    pub concurrency: usize,
    /// Upper bound on one ticker's evaluation, if any.
    #[serde(with = "optional_seconds")]
    pub per_ticker_timeout: Option<Duration>,
    /// Models to compute, in output order.
    pub models: Vec<Model>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            per_ticker_timeout: None,
            models: Model::ALL.to_vec(),
        }
    }
}

impl BatchConfig {
    /// Sets the number of tickers evaluated at once.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the per-ticker timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.per_ticker_timeout = Some(timeout);
        self
    }

    /// Sets the models to compute. Duplicates are dropped.
    #[must_use]
    pub fn with_models(mut self, models: impl IntoIterator<Item = Model>) -> Self {
        self.models.clear();
        for model in models {
            if !self.models.contains(&model) {
                self.models.push(model);
            }
        }
        self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::InvalidParameter`] for zero concurrency or a
    /// zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ValuationError::InvalidParameter(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.per_ticker_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ValuationError::InvalidParameter(
                "per-ticker timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

mod optional_seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(deserializer)?;
        secs.map(|s| Duration::try_from_secs_f64(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// A ticker whose data could not be obtained. Its row is all nulls.
#[derive(Clone, Debug, PartialEq)]
pub struct Omission {
    /// The ticker.
    pub symbol: Symbol,
    /// Why it was omitted.
    pub reason: ValuationError,
}

impl fmt::Display for Omission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.symbol, self.reason)
    }
}

/// Result of a batch: one record per requested ticker, in request order.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchOutcome {
    /// Records, one per requested ticker.
    pub records: Vec<ValuationRecord>,
    /// Tickers that failed at the ticker level.
    pub omissions: Vec<Omission>,
}

impl BatchOutcome {
    /// Flattens the records into a table.
    #[must_use]
    pub fn table(&self) -> ValuationTable {
        ValuationTable::new(self.records.clone())
    }
}

/// Runs extraction, valuation and returns over a list of tickers.
///
/// A ticker-level failure never aborts the batch: it produces an all-null row
/// and an [`Omission`].
#[derive(Debug, Clone)]
pub struct BatchRunner {
    extractor: FieldExtractor,
    engine: ValuationEngine,
    config: BatchConfig,
}

impl BatchRunner {
    /// Creates a runner.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::InvalidParameter`] if the assumptions or the
    /// batch settings are invalid.
    pub fn new(
        source: Arc<dyn FinancialDataSource>,
        assumptions: Assumptions,
        config: BatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extractor: FieldExtractor::new(source),
            engine: ValuationEngine::new(assumptions)?,
            config,
        })
    }

    /// The batch settings.
    #[must_use]
    pub const fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Evaluates a single ticker.
    ///
    /// # Errors
    ///
    /// Returns the extractor's ticker-level error.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn evaluate(&self, symbol: &Symbol, as_of: NaiveDate) -> Result<ValuationRecord> {
        let extraction = self.extractor.fetch(symbol).await?;
        let record = ValuationRecord::new(symbol.clone(), as_of)
            .with_extraction(extraction.quote, extraction.fields);
        Ok(self.engine.value_record(record, &self.config.models))
    }

    /// Evaluates every ticker as of today (UTC).
    pub async fn evaluate_all(&self, symbols: &[Symbol]) -> BatchOutcome {
        self.evaluate_all_as_of(symbols, Utc::now().date_naive()).await
    }

    /// Evaluates every ticker with an explicit valuation date.
    ///
    /// The outcome has exactly one record per entry of `symbols`, in the same
    /// order.
    pub async fn evaluate_all_as_of(&self, symbols: &[Symbol], as_of: NaiveDate) -> BatchOutcome {
        info!(
            tickers = symbols.len(),
            concurrency = self.config.concurrency,
            "Starting batch"
        );

        let results: Vec<_> = stream::iter(symbols)
            .map(|symbol| self.evaluate_guarded(symbol, as_of))
            .buffered(self.config.concurrency)
            .collect()
            .await;

        let mut records = Vec::with_capacity(results.len());
        let mut omissions = Vec::new();
        for (record, omission) in results {
            records.push(record);
            omissions.extend(omission);
        }

        info!(
            tickers = records.len(),
            omitted = omissions.len(),
            "Batch complete"
        );
        BatchOutcome { records, omissions }
    }

    async fn evaluate_guarded(
        &self,
        symbol: &Symbol,
        as_of: NaiveDate,
    ) -> (ValuationRecord, Option<Omission>) {
        let result = match self.config.per_ticker_timeout {
            Some(limit) => tokio::time::timeout(limit, self.evaluate(symbol, as_of))
                .await
                .unwrap_or_else(|_| {
                    Err(ValuationError::Timeout {
                        symbol: symbol.to_string(),
                        elapsed: limit,
                    })
                }),
            None => self.evaluate(symbol, as_of).await,
        };

        match result {
            Ok(record) => (record, None),
            Err(reason) => {
                warn!(symbol = %symbol, reason = %reason, "Ticker omitted");
                (
                    ValuationRecord::unavailable(symbol.clone(), as_of, reason.to_string()),
                    Some(Omission {
                        symbol: symbol.clone(),
                        reason,
                    }),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valuation_core::{Field, InMemorySource, Quote, RawField};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    fn seeded(source: InMemorySource, symbol: &str, price: f64) -> InMemorySource {
        source
            .with_quote(symbol, Quote::new(price, date()))
            .with_field(symbol, Field::Eps, RawField::new("5"))
            .with_field(symbol, Field::GrowthRate, RawField::new("10%").scaled(0.01))
            .with_series(
                symbol,
                valuation_core::HistoricalMetric::PriceEarnings,
                valuation_core::RawSeries::new(["15", "15", "15", "15", "15", "40"]),
            )
    }

    fn runner(source: InMemorySource, config: BatchConfig) -> BatchRunner {
        BatchRunner::new(Arc::new(source), Assumptions::default(), config).unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(BatchConfig::default().validate().is_ok());
        assert!(BatchConfig::default().with_concurrency(0).validate().is_err());
        assert!(
            BatchConfig::default()
                .with_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        let config = BatchConfig::default().with_models([Model::Dcf, Model::Dcf, Model::Pe]);
        assert_eq!(config.models, vec![Model::Dcf, Model::Pe]);
    }

    #[tokio::test]
    async fn test_one_unreachable_ticker_is_one_null_row() {
        let source = seeded(InMemorySource::new(), "AAA", 50.0);
        let source = seeded(source, "CCC", 100.0)
            .with_symbol("BBB")
            .with_unreachable("BBB");
        let symbols = [Symbol::new("AAA"), Symbol::new("BBB"), Symbol::new("CCC")];

        let outcome = runner(source, BatchConfig::default())
            .evaluate_all_as_of(&symbols, date())
            .await;

        assert_eq!(outcome.records.len(), 3);
        let order: Vec<_> = outcome.records.iter().map(|r| r.symbol().as_str()).collect();
        assert_eq!(order, ["AAA", "BBB", "CCC"]);

        assert_eq!(outcome.omissions.len(), 1);
        assert_eq!(outcome.omissions[0].symbol, Symbol::new("BBB"));
        assert!(matches!(
            outcome.omissions[0].reason,
            ValuationError::SourceUnreachable { .. }
        ));

        let empty: Vec<_> = outcome.records.iter().filter(|r| r.is_empty()).collect();
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].symbol().as_str(), "BBB");

        let pe = outcome.records[0].valuation(Model::Pe).unwrap();
        assert!((pe - 76.752).abs() < 1e-2);
        assert_eq!(outcome.records[0].valuation(Model::Dcf), None);
    }

    #[tokio::test]
    async fn test_unreachable_ticker_behind_point_only_registry_is_omitted() {
        let source = seeded(InMemorySource::new(), "AAA", 50.0)
            .with_symbol("BBB")
            .with_unreachable("BBB")
            .without_series();
        let registry = crate::SourceRegistry::new().with_source(Arc::new(source));
        let runner =
            BatchRunner::new(Arc::new(registry), Assumptions::default(), BatchConfig::default())
                .unwrap();

        let outcome = runner
            .evaluate_all_as_of(&[Symbol::new("AAA"), Symbol::new("BBB")], date())
            .await;

        assert_eq!(outcome.records.len(), 2);
        assert!(!outcome.records[0].is_empty());
        assert!(outcome.records[1].is_empty());
        assert_eq!(outcome.omissions.len(), 1);
        assert_eq!(outcome.omissions[0].symbol, Symbol::new("BBB"));
        assert!(matches!(
            outcome.omissions[0].reason,
            ValuationError::SourceUnreachable { .. }
        ));
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_omitted() {
        let source = seeded(InMemorySource::new(), "AAA", 50.0);
        let outcome = runner(source, BatchConfig::default().with_concurrency(1))
            .evaluate_all_as_of(&[Symbol::new("NOPE"), Symbol::new("AAA")], date())
            .await;

        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.records[0].is_empty());
        assert!(matches!(
            outcome.omissions[0].reason,
            ValuationError::SymbolNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_timeout_omits_only_slow_ticker() {
        let source = seeded(InMemorySource::new(), "FAST", 50.0);
        let source = seeded(source, "SLOW", 50.0).with_latency("SLOW", Duration::from_secs(5));
        let config = BatchConfig::default().with_timeout(Duration::from_millis(100));

        let outcome = runner(source, config)
            .evaluate_all_as_of(&[Symbol::new("SLOW"), Symbol::new("FAST")], date())
            .await;

        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.records[0].is_empty());
        assert!(outcome.records[1].valuation(Model::Pe).is_some());
        assert_eq!(outcome.omissions.len(), 1);
        assert!(matches!(
            outcome.omissions[0].reason,
            ValuationError::Timeout { .. }
        ));
    }

    #[tokio::test]
    async fn test_concurrency_does_not_change_result() {
        let mut source = InMemorySource::new();
        let mut symbols = Vec::new();
        for (i, name) in ["A", "B", "C", "D", "E", "F"].into_iter().enumerate() {
            source = seeded(source, name, 10.0 + i as f64);
            symbols.push(Symbol::new(name));
        }
        let source = Arc::new(source);

        let sequential = BatchRunner::new(
            source.clone(),
            Assumptions::default(),
            BatchConfig::default().with_concurrency(1),
        )
        .unwrap()
        .evaluate_all_as_of(&symbols, date())
        .await;
        let parallel = BatchRunner::new(
            source,
            Assumptions::default(),
            BatchConfig::default().with_concurrency(4),
        )
        .unwrap()
        .evaluate_all_as_of(&symbols, date())
        .await;

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_config_timeout_in_seconds() {
        let config: BatchConfig = serde_json::from_str(
            r#"{"concurrency": 2, "per_ticker_timeout": 1.5, "models": ["pe", "roe"]}"#,
        )
        .unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.per_ticker_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.models, vec![Model::Pe, Model::Roe]);
    }
}
