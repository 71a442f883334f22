//! Runs the valuation models over a record.

use std::{collections::BTreeMap, fmt, sync::Arc};

use tracing::{debug, warn};
use valuation_core::{Assumptions, FieldSet, Model, Result, ValuationRecord};

use crate::{
    dcf::DcfModel,
    error::ModelError,
    model::{ModelOutput, ValuationModel},
    pe::PeModel,
    returns::apply_value_returns,
    roe::RoeModel,
};

/// Applies the valuation models under one set of validated assumptions.
///
/// A model that cannot be computed leaves its valuation absent and never
/// prevents the other models from running.
#[derive(Clone)]
pub struct ValuationEngine {
    assumptions: Assumptions,
    models: BTreeMap<Model, Arc<dyn ValuationModel>>,
}

impl ValuationEngine {
    /// Creates an engine with the three built-in models.
    ///
    /// # Errors
    ///
    /// Returns [`valuation_core::ValuationError::InvalidParameter`] if the
    /// assumptions are out of range.
    pub fn new(assumptions: Assumptions) -> Result<Self> {
        assumptions.validate()?;
        Ok(Self {
            assumptions,
            models: BTreeMap::new(),
        }
        .with_model(PeModel)
        .with_model(DcfModel)
        .with_model(RoeModel))
    }

    /// Registers or replaces the implementation of a model.
    #[must_use]
    pub fn with_model<M: ValuationModel + 'static>(mut self, model: M) -> Self {
        self.models.insert(model.model(), Arc::new(model));
        self
    }

    /// The assumptions in effect.
    #[must_use]
    pub const fn assumptions(&self) -> &Assumptions {
        &self.assumptions
    }

    /// Computes one model over a field set.
    ///
    /// # Errors
    ///
    /// Returns the model's [`ModelError`] when it is not computable.
    pub fn value(
        &self,
        model: Model,
        fields: &FieldSet,
    ) -> std::result::Result<ModelOutput, ModelError> {
        match self.models.get(&model) {
            Some(m) => m.compute(fields, &self.assumptions),
            None => Err(ModelError::Unregistered { model }),
        }
    }

    /// Valuation and return stages: computes `models` for the record and the
    /// implied return of each value.
    ///
    /// Only the requested models are touched. Running the same record twice
    /// gives the same result.
    #[must_use]
    pub fn value_record(&self, record: ValuationRecord, models: &[Model]) -> ValuationRecord {
        let mut record = record;
        for &model in models {
            record = match self.value(model, record.fields()) {
                Ok(output) => {
                    debug!(symbol = %record.symbol(), model = %model, value = output.value, "Computed valuation");
                    let mut record = record.with_valuation(model, output.value);
                    for warning in output.warnings {
                        record = record.with_note(model, warning.to_string());
                    }
                    record
                }
                Err(e) => {
                    warn!(symbol = %record.symbol(), model = %model, reason = %e, "Valuation not computable");
                    record.with_not_computable(model, e.to_string())
                }
            };
        }
        apply_value_returns(record)
    }
}

impl fmt::Debug for ValuationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuationEngine")
            .field("assumptions", &self.assumptions)
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use valuation_core::{Field, FieldValue, MissingReason, Quote, Symbol, ValuationError};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    fn full_fields() -> FieldSet {
        FieldSet::default()
            .with_value(Field::Eps, 5.0)
            .with_value(Field::GrowthRate, 0.10)
            .with_value(Field::MedianHistoricalPe, 15.0)
            .with_value(Field::FreeCashFlow, 100e6)
            .with_value(Field::CashAndEquivalents, 50e6)
            .with_value(Field::TotalLiabilities, 80e6)
            .with_value(Field::SharesOutstanding, 10e6)
            .with_value(Field::ShareholdersEquity, 200e6)
            .with_value(Field::ReturnOnEquity5y, 0.15)
            .with_value(Field::DividendPerShare, 1.0)
    }

    fn record(fields: FieldSet) -> ValuationRecord {
        ValuationRecord::new(Symbol::new("ACME"), date())
            .with_extraction(Some(Quote::new(50.0, date())), fields)
    }

    #[test]
    fn test_invalid_assumptions_rejected() {
        let result = ValuationEngine::new(Assumptions::default().with_margin_of_safety(1.5));
        assert!(matches!(result, Err(ValuationError::InvalidParameter(_))));
    }

    #[test]
    fn test_all_models_and_returns() {
        let engine = ValuationEngine::new(Assumptions::default()).unwrap();
        let record = engine.value_record(record(full_fields()), &Model::ALL);

        assert!((record.valuation(Model::Pe).unwrap() - 76.752).abs() < 1e-2);
        assert!((record.valuation(Model::Dcf).unwrap() - 201.241).abs() < 1e-2);
        assert!((record.valuation(Model::Roe).unwrap() - 50.352).abs() < 1e-2);

        let pe_return = record.value_return(Model::Pe).unwrap();
        assert!((pe_return - (76.752 / 50.0 - 1.0)).abs() < 1e-3);
        assert!(record.notes().is_empty());
    }

    #[test]
    fn test_missing_field_isolated_to_one_model() {
        let engine = ValuationEngine::new(Assumptions::default()).unwrap();
        let fields = full_fields().with(
            Field::FreeCashFlow,
            FieldValue::Missing(MissingReason::Unavailable),
        );
        let record = engine.value_record(record(fields), &Model::ALL);

        assert!(record.valuation(Model::Pe).is_some());
        assert!(record.valuation(Model::Roe).is_some());
        assert_eq!(record.valuation(Model::Dcf), None);
        assert_eq!(record.value_return(Model::Dcf), None);
        assert!(record.not_computable(Model::Dcf).is_some());
    }

    #[test]
    fn test_negative_eps_adds_note() {
        let engine = ValuationEngine::new(Assumptions::default()).unwrap();
        let record = engine.value_record(
            record(full_fields().with_value(Field::Eps, -1.0)),
            &[Model::Pe],
        );

        assert!(record.valuation(Model::Pe).unwrap() < 0.0);
        assert_eq!(record.notes().len(), 1);
        assert_eq!(record.notes()[0].model, Model::Pe);
    }

    #[test]
    fn test_only_requested_models_run() {
        let engine = ValuationEngine::new(Assumptions::default()).unwrap();
        let record = engine.value_record(record(full_fields()), &[Model::Dcf]);

        assert_eq!(record.valuations().len(), 1);
        assert!(record.valuation(Model::Dcf).is_some());
        assert_eq!(record.not_computable(Model::Pe), None);
    }

    #[test]
    fn test_value_record_is_idempotent() {
        let engine = ValuationEngine::new(Assumptions::default()).unwrap();
        let once = engine.value_record(record(full_fields()), &Model::ALL);
        let twice = engine.value_record(once.clone(), &Model::ALL);
        assert_eq!(once, twice);

        let negative = record(full_fields().with_value(Field::Eps, -1.0));
        let once = engine.value_record(negative, &Model::ALL);
        let twice = engine.value_record(once.clone(), &Model::ALL);
        assert_eq!(once, twice);
        assert_eq!(twice.notes().len(), 1);
    }
}
