//! Return-on-equity valuation.

use valuation_core::{Assumptions, Field, FieldSet, Model};

use crate::{
    error::ModelError,
    model::{ModelOutput, ValuationModel, discount, finite, nonzero, require},
};

/// Years of equity and dividend growth projected.
pub const PROJECTION_YEARS: i32 = 10;

/// Intermediate quantities of the return-on-equity model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoeBreakdown {
    /// Present value of the projected dividends.
    pub dividends_present_value: f64,
    /// Shareholders' equity per share after [`PROJECTION_YEARS`].
    pub future_equity_per_share: f64,
    /// Present value of the price implied by future equity and average ROE.
    pub required_value_present_value: f64,
}

impl RoeBreakdown {
    /// Value per share.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.dividends_present_value + self.required_value_present_value
    }
}

/// Return-on-equity model.
///
/// Equity per share and the dividend both grow at the margin-of-safety
/// adjusted rate for ten years. The dividend paid in year `k` is discounted
/// by `(1 + r)^(k − 1)`. Year-ten net income (`equity₁₀ × ROE`) is
/// capitalised at `r` and discounted by `(1 + r)^10`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoeModel;

impl RoeModel {
    /// Computes the intermediate quantities.
    ///
    /// # Errors
    ///
    /// Fails like [`ValuationModel::compute`].
    pub fn breakdown(
        &self,
        fields: &FieldSet,
        assumptions: &Assumptions,
    ) -> Result<RoeBreakdown, ModelError> {
        let model = self.model();
        let equity = require(model, fields, Field::ShareholdersEquity)?;
        let shares = nonzero(
            model,
            require(model, fields, Field::SharesOutstanding)?,
            "shares outstanding",
        )?;
        let roe = require(model, fields, Field::ReturnOnEquity5y)?;
        let dividend = require(model, fields, Field::DividendPerShare)?;
        let growth = require(model, fields, Field::GrowthRate)?;
        let rate = nonzero(model, assumptions.discount_rate, "discount rate")?;

        let g = assumptions.safe_growth(growth);
        let equity_per_share = equity / shares;

        let dividends_present_value = (1..=PROJECTION_YEARS)
            .map(|year| discount(dividend * (1.0 + g).powi(year), rate, year - 1))
            .sum::<f64>();
        let future_equity_per_share = equity_per_share * (1.0 + g).powi(PROJECTION_YEARS);
        let required_value = future_equity_per_share * roe / rate;
        let required_value_present_value = discount(required_value, rate, PROJECTION_YEARS);

        Ok(RoeBreakdown {
            dividends_present_value,
            future_equity_per_share,
            required_value_present_value,
        })
    }
}

impl ValuationModel for RoeModel {
    fn model(&self) -> Model {
        Model::Roe
    }

    fn required_fields(&self) -> &[Field] {
        &[
            Field::ShareholdersEquity,
            Field::SharesOutstanding,
            Field::ReturnOnEquity5y,
            Field::DividendPerShare,
            Field::GrowthRate,
        ]
    }

    fn compute(
        &self,
        fields: &FieldSet,
        assumptions: &Assumptions,
    ) -> Result<ModelOutput, ModelError> {
        let breakdown = self.breakdown(fields, assumptions)?;
        finite(self.model(), breakdown.value()).map(ModelOutput::new)
    }
}
