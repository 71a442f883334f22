//! The valuation model trait and its output.

use std::fmt;

use valuation_core::{Assumptions, Field, FieldSet, FieldValue, MissingReason, Model};

use crate::error::ModelError;

/// A non-fatal condition observed while computing a model.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelWarning {
    /// Earnings are negative; the P/E projection is not meaningful.
    NegativeEps(f64),
}

impl fmt::Display for ModelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeEps(eps) => {
                write!(f, "EPS is negative ({eps}); P/E valuation is not useful")
            }
        }
    }
}

/// A computed per-share value and any warnings raised while computing it.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelOutput {
    /// Intrinsic value per share.
    pub value: f64,
    /// Non-fatal warnings.
    pub warnings: Vec<ModelWarning>,
}

impl ModelOutput {
    /// Creates an output without warnings.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Adds a warning.
    #[must_use]
    pub fn with_warning(mut self, warning: ModelWarning) -> Self {
        self.warnings.push(warning);
        self
    }
}

/// An intrinsic-value model over a [`FieldSet`].
///
/// Implementations are pure: the same fields and assumptions always give the
/// same result.
pub trait ValuationModel: Send + Sync + fmt::Debug {
    /// Which model this is.
    fn model(&self) -> Model;

    /// Fields that must be present for the model to be computable.
    fn required_fields(&self) -> &[Field];

    /// Computes the per-share value.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] when a required field is missing, a denominator
    /// is zero, or the result is not finite.
    fn compute(&self, fields: &FieldSet, assumptions: &Assumptions)
    -> Result<ModelOutput, ModelError>;
}

/// Reads a required field, failing with the field's missing reason.
pub(crate) fn require(model: Model, fields: &FieldSet, field: Field) -> Result<f64, ModelError> {
    match fields.get(field) {
        FieldValue::Present(v) if v.is_finite() => Ok(*v),
        FieldValue::Present(v) => Err(ModelError::MissingField {
            model,
            field,
            reason: MissingReason::Unparsable(v.to_string()),
        }),
        FieldValue::Missing(reason) => Err(ModelError::MissingField {
            model,
            field,
            reason: reason.clone(),
        }),
    }
}

/// Fails with [`ModelError::ZeroDenominator`] when `value` is zero.
pub(crate) fn nonzero(model: Model, value: f64, what: &'static str) -> Result<f64, ModelError> {
    if value == 0.0 {
        Err(ModelError::ZeroDenominator { model, what })
    } else {
        Ok(value)
    }
}

/// Fails with [`ModelError::NonFinite`] unless `value` is finite.
pub(crate) fn finite(model: Model, value: f64) -> Result<f64, ModelError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ModelError::NonFinite { model })
    }
}

/// Present value of `amount` received `years` from now.
pub(crate) fn discount(amount: f64, rate: f64, years: i32) -> f64 {
    amount / (1.0 + rate).powi(years)
}
