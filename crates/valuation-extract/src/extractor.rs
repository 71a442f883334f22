//! Per-ticker extraction of the quote and the ten fields.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument, warn};
use valuation_core::{
    Field, FieldOrigin, FieldSet, FieldValue, FinancialDataSource, HistoricalMetric,
    MissingReason, Quote, Result, Symbol, ValuationError,
};

use crate::{
    history::{five_year_roe, median_historical_pe},
    parse::parse_field,
};

/// The result of extracting one ticker.
#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    /// The quote, if the source had one.
    pub quote: Option<Quote>,
    /// All ten fields, present or missing.
    pub fields: FieldSet,
}

/// Outcome of a single field lookup.
#[derive(Debug)]
struct FieldOutcome {
    field: Field,
    value: FieldValue,
    error: Option<ValuationError>,
}

/// Fetches and parses every field of a ticker from a [`FinancialDataSource`].
///
/// Fields are requested concurrently and independently: a failed or
/// unparsable field is recorded as missing and never prevents the others.
#[derive(Clone, Debug)]
pub struct FieldExtractor {
    source: Arc<dyn FinancialDataSource>,
}

impl FieldExtractor {
    /// Creates an extractor over a source.
    #[must_use]
    pub fn new(source: Arc<dyn FinancialDataSource>) -> Self {
        Self { source }
    }

    /// The underlying source.
    #[must_use]
    pub fn source(&self) -> &Arc<dyn FinancialDataSource> {
        &self.source
    }

    /// Fetches the quote and all fields for a symbol.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::SymbolNotFound`] if the source does not know the
    /// symbol, and [`ValuationError::SourceUnreachable`] if the quote and every
    /// field request the source supports failed. Single-field failures are
    /// never errors.
    #[instrument(skip(self), fields(symbol = %symbol, provider = self.source.name()))]
    pub async fn fetch(&self, symbol: &Symbol) -> Result<Extraction> {
        let (quote, outcomes) = futures::join!(
            self.source.fetch_quote(symbol),
            join_all(Field::ALL.into_iter().map(|field| self.fetch_one(symbol, field)))
        );

        let quote = match quote {
            Ok(quote) => Ok(quote),
            Err(ValuationError::SymbolNotFound(s)) => {
                return Err(ValuationError::SymbolNotFound(s));
            }
            Err(e) => {
                warn!(error = %e, "Quote request failed");
                Err(e)
            }
        };

        // unsupported fields were never requested
        let all_failed = outcomes
            .iter()
            .filter(|o| !matches!(o.error, Some(ValuationError::NotSupported(_))))
            .all(|o| o.error.is_some());
        if all_failed {
            if let Err(e) = &quote {
                return Err(ValuationError::SourceUnreachable {
                    symbol: symbol.to_string(),
                    reason: e.to_string(),
                });
            }
        }

        let fields: FieldSet = outcomes.into_iter().map(|o| (o.field, o.value)).collect();
        debug!(
            present = fields.present_count(),
            total = Field::COUNT,
            "Extracted fields"
        );

        Ok(Extraction {
            quote: quote.ok().flatten(),
            fields,
        })
    }

    async fn fetch_one(&self, symbol: &Symbol, field: Field) -> FieldOutcome {
        let result = match field.origin() {
            FieldOrigin::Point => self
                .source
                .fetch_field(symbol, field)
                .await
                .map(|raw| raw.map(|raw| parse_field(&raw))),
            FieldOrigin::Series(metric) => self
                .source
                .fetch_historical_series(symbol, metric)
                .await
                .map(|series| {
                    series.map(|series| match metric {
                        HistoricalMetric::PriceEarnings => median_historical_pe(&series),
                        HistoricalMetric::ReturnOnEquity => five_year_roe(&series),
                    })
                }),
        };

        match result {
            Ok(Some(value)) => {
                if let FieldValue::Missing(reason) = &value {
                    debug!(field = ?field, reason = %reason, "Field missing");
                }
                FieldOutcome {
                    field,
                    value,
                    error: None,
                }
            }
            Ok(None) => {
                debug!(field = ?field, "Field unavailable from source");
                FieldOutcome {
                    field,
                    value: FieldValue::Missing(MissingReason::Unavailable),
                    error: None,
                }
            }
            Err(ValuationError::NotSupported(reason)) => {
                debug!(field = ?field, %reason, "Field not supported by source");
                FieldOutcome {
                    field,
                    value: FieldValue::Missing(MissingReason::Unavailable),
                    error: Some(ValuationError::NotSupported(reason)),
                }
            }
            Err(e) => {
                warn!(field = ?field, error = %e, "Field request failed");
                FieldOutcome {
                    field,
                    value: FieldValue::Missing(MissingReason::FetchFailed(e.to_string())),
                    error: Some(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use valuation_core::{InMemorySource, RawField, RawSeries};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    fn extractor(source: InMemorySource) -> FieldExtractor {
        FieldExtractor::new(Arc::new(source))
    }

    #[tokio::test]
    async fn test_fetch_parses_and_aggregates() {
        let source = InMemorySource::new()
            .with_quote("ACME", Quote::new(42.0, date()))
            .with_field("ACME", Field::Eps, RawField::new("3.10"))
            .with_field("ACME", Field::GrowthRate, RawField::new("9.5%").scaled(0.01))
            .with_field("ACME", Field::FreeCashFlow, RawField::new("1,250").scaled(1e6))
            .with_series(
                "ACME",
                HistoricalMetric::PriceEarnings,
                RawSeries::new(["10", "12", "11", "13", "14", "9", "15"]),
            );

        let extraction = extractor(source).fetch(&Symbol::new("acme")).await.unwrap();

        assert_eq!(extraction.quote, Some(Quote::new(42.0, date())));
        assert_eq!(extraction.fields.value(Field::Eps), Some(3.10));
        let growth = extraction.fields.value(Field::GrowthRate).unwrap();
        assert!((growth - 0.095).abs() < 1e-12);
        assert_eq!(extraction.fields.value(Field::FreeCashFlow), Some(1.25e9));
        assert_eq!(extraction.fields.value(Field::MedianHistoricalPe), Some(12.0));
        assert_eq!(
            extraction.fields.get(Field::CashAndEquivalents),
            &FieldValue::Missing(MissingReason::Unavailable)
        );
        assert_eq!(
            extraction.fields.get(Field::ReturnOnEquity5y),
            &FieldValue::Missing(MissingReason::Unavailable)
        );
    }

    #[tokio::test]
    async fn test_unparsable_field_is_missing_not_zero() {
        let source = InMemorySource::new()
            .with_quote("ACME", Quote::new(42.0, date()))
            .with_field("ACME", Field::Eps, RawField::new(""))
            .with_field("ACME", Field::TotalLiabilities, RawField::new("n/a"))
            .with_field("ACME", Field::SharesOutstanding, RawField::new("100"));

        let extraction = extractor(source).fetch(&Symbol::new("ACME")).await.unwrap();

        assert_eq!(extraction.fields.value(Field::Eps), None);
        assert!(matches!(
            extraction.fields.get(Field::TotalLiabilities),
            FieldValue::Missing(MissingReason::Unparsable(_))
        ));
        assert_eq!(extraction.fields.value(Field::SharesOutstanding), Some(100.0));
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_ticker_error() {
        let result = extractor(InMemorySource::new())
            .fetch(&Symbol::new("ZZZZ"))
            .await;
        assert!(matches!(result, Err(ValuationError::SymbolNotFound(_))));
    }

    #[tokio::test]
    async fn test_unreachable_source_is_ticker_error() {
        let source = InMemorySource::new()
            .with_symbol("DOWN")
            .with_unreachable("DOWN");
        let result = extractor(source).fetch(&Symbol::new("DOWN")).await;
        assert!(matches!(
            result,
            Err(ValuationError::SourceUnreachable { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_point_only_source_is_ticker_error() {
        let source = InMemorySource::new()
            .with_symbol("DOWN")
            .with_unreachable("DOWN")
            .without_series();
        let result = extractor(source).fetch(&Symbol::new("DOWN")).await;
        assert!(matches!(
            result,
            Err(ValuationError::SourceUnreachable { .. })
        ));
    }

    #[tokio::test]
    async fn test_unsupported_series_are_unavailable() {
        let source = InMemorySource::new()
            .with_quote("ACME", Quote::new(42.0, date()))
            .with_field("ACME", Field::Eps, RawField::new("3.10"))
            .without_series();

        let extraction = extractor(source).fetch(&Symbol::new("ACME")).await.unwrap();

        assert_eq!(extraction.fields.value(Field::Eps), Some(3.10));
        for field in [Field::MedianHistoricalPe, Field::ReturnOnEquity5y] {
            assert_eq!(
                extraction.fields.get(field),
                &FieldValue::Missing(MissingReason::Unavailable)
            );
        }
    }

    #[tokio::test]
    async fn test_missing_quote_is_not_an_error() {
        let source =
            InMemorySource::new().with_field("ACME", Field::Eps, RawField::new("1.0"));
        let extraction = extractor(source).fetch(&Symbol::new("ACME")).await.unwrap();
        assert!(extraction.quote.is_none());
        assert_eq!(extraction.fields.present_count(), 1);
    }
}
