//! Earnings-multiple valuation.

use tracing::warn;
use valuation_core::{Assumptions, Field, FieldSet, Model};

use crate::{
    error::ModelError,
    model::{ModelOutput, ModelWarning, ValuationModel, discount, finite, require},
};

/// Years of earnings growth projected before applying the multiple.
pub const PROJECTION_YEARS: i32 = 5;

/// Earnings-multiple model.
///
/// # Formula
///
/// ```text
/// g     = growth_rate × (1 − margin_of_safety)
/// value = EPS × (1 + g)^5 × median_historical_pe / (1 + discount_rate)^5
/// ```
///
/// Negative EPS still yields a number but raises [`ModelWarning::NegativeEps`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PeModel;

impl ValuationModel for PeModel {
    fn model(&self) -> Model {
        Model::Pe
    }

    fn required_fields(&self) -> &[Field] {
        &[Field::Eps, Field::GrowthRate, Field::MedianHistoricalPe]
    }

    fn compute(
        &self,
        fields: &FieldSet,
        assumptions: &Assumptions,
    ) -> Result<ModelOutput, ModelError> {
        let model = self.model();
        let eps = require(model, fields, Field::Eps)?;
        let growth = require(model, fields, Field::GrowthRate)?;
        let pe = require(model, fields, Field::MedianHistoricalPe)?;

        let safe_growth = assumptions.safe_growth(growth);
        let future_eps = eps * (1.0 + safe_growth).powi(PROJECTION_YEARS);
        let future_value = future_eps * pe;
        let value = finite(
            model,
            discount(future_value, assumptions.discount_rate, PROJECTION_YEARS),
        )?;

        let mut output = ModelOutput::new(value);
        if eps < 0.0 {
            warn!(eps, "EPS is negative, P/E valuation is not useful");
            output = output.with_warning(ModelWarning::NegativeEps(eps));
        }
        Ok(output)
    }
}
