//! Reasons a valuation model cannot produce a value.

use thiserror::Error;
use valuation_core::{Field, MissingReason, Model};

/// Why a model is not computable for a record.
///
/// These are recovered locally: the model's valuation is left absent and the
/// other models still run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A required field is missing.
    #[error("{model} requires {field}, which is missing ({reason})")]
    MissingField {
        /// The model being computed.
        model: Model,
        /// The missing field.
        field: Field,
        /// Why the field is missing.
        reason: MissingReason,
    },

    /// A denominator of the model is zero.
    #[error("{model} divides by {what}, which is zero")]
    ZeroDenominator {
        /// The model being computed.
        model: Model,
        /// The quantity that was zero.
        what: &'static str,
    },

    /// The model produced a non-finite number.
    #[error("{model} produced a non-finite value")]
    NonFinite {
        /// The model being computed.
        model: Model,
    },

    /// No implementation is registered for the model.
    #[error("no implementation registered for {model}")]
    Unregistered {
        /// The requested model.
        model: Model,
    },
}

impl ModelError {
    /// The model that failed.
    #[must_use]
    pub const fn model(&self) -> Model {
        match self {
            Self::MissingField { model, .. }
            | Self::ZeroDenominator { model, .. }
            | Self::NonFinite { model }
            | Self::Unregistered { model } => *model,
        }
    }
}
