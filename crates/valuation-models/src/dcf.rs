//! Discounted free cash flow valuation.

use valuation_core::{Assumptions, Field, FieldSet, Model};

use crate::{
    error::ModelError,
    model::{ModelOutput, ValuationModel, discount, finite, nonzero, require},
};

/// Years of cash flow projected explicitly.
pub const PROJECTION_YEARS: i32 = 10;

/// Ten-year discounted cash flow model with decaying growth and a terminal
/// multiple.
///
/// In year `t` (0-based) cash flow grows by `1 + g × (1 − decay)^t`, where `g`
/// is the margin-of-safety adjusted growth rate. Year `t + 1` is discounted at
/// `(1 + r)^(t + 1)`. The terminal value is the last discounted flow times the
/// terminal multiplier. Enterprise value adds cash and subtracts total
/// liabilities, then divides by shares outstanding.
#[derive(Debug, Clone, Copy, Default)]
pub struct DcfModel;

impl DcfModel {
    /// Discounted cash flows for years 1 through [`PROJECTION_YEARS`].
    #[must_use]
    pub fn discounted_flows(free_cash_flow: f64, growth: f64, assumptions: &Assumptions) -> Vec<f64> {
        let mut flow = free_cash_flow;
        let mut decay = 1.0;
        (1..=PROJECTION_YEARS)
            .map(|year| {
                flow *= 1.0 + growth * decay;
                decay *= 1.0 - assumptions.growth_decay_rate;
                discount(flow, assumptions.discount_rate, year)
            })
            .collect()
    }
}

impl ValuationModel for DcfModel {
    fn model(&self) -> Model {
        Model::Dcf
    }

    fn required_fields(&self) -> &[Field] {
        &[
            Field::FreeCashFlow,
            Field::GrowthRate,
            Field::CashAndEquivalents,
            Field::TotalLiabilities,
            Field::SharesOutstanding,
        ]
    }

    fn compute(
        &self,
        fields: &FieldSet,
        assumptions: &Assumptions,
    ) -> Result<ModelOutput, ModelError> {
        let model = self.model();
        let fcf = require(model, fields, Field::FreeCashFlow)?;
        let growth = require(model, fields, Field::GrowthRate)?;
        let cash = require(model, fields, Field::CashAndEquivalents)?;
        let liabilities = require(model, fields, Field::TotalLiabilities)?;
        let shares = nonzero(
            model,
            require(model, fields, Field::SharesOutstanding)?,
            "shares outstanding",
        )?;

        let flows = Self::discounted_flows(fcf, assumptions.safe_growth(growth), assumptions);
        let last = flows.last().copied().unwrap_or_default();
        let terminal = last * assumptions.terminal_multiplier;
        let enterprise_value = flows.iter().sum::<f64>() + terminal + cash - liabilities;

        finite(model, enterprise_value / shares).map(ModelOutput::new)
    }
}
