//! Valuation assumptions shared by every model.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValuationError};

/// Default margin of safety applied to growth estimates.
pub const DEFAULT_MARGIN_OF_SAFETY: f64 = 0.15;
/// Default annual discount rate.
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.08;
/// Default geometric decay of the growth rate in the DCF projection.
pub const DEFAULT_GROWTH_DECAY_RATE: f64 = 0.05;
/// Default multiple applied to the final discounted cash flow.
pub const DEFAULT_TERMINAL_MULTIPLIER: f64 = 12.0;

/// The named parameters every valuation model accepts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Assumptions {
    /// Fraction by which the growth estimate is cut, in `[0, 1)`.
    pub margin_of_safety: f64,
    /// Annual rate used to discount future values, greater than `-1`.
    pub discount_rate: f64,
    /// Per-year geometric decay of growth in the DCF projection, in `[0, 1]`.
    pub growth_decay_rate: f64,
    /// Multiple of the year-10 discounted cash flow used as terminal value.
    pub terminal_multiplier: f64,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            margin_of_safety: DEFAULT_MARGIN_OF_SAFETY,
            discount_rate: DEFAULT_DISCOUNT_RATE,
            growth_decay_rate: DEFAULT_GROWTH_DECAY_RATE,
            terminal_multiplier: DEFAULT_TERMINAL_MULTIPLIER,
        }
    }
}

impl Assumptions {
    /// Sets the margin of safety.
    #[must_use]
    pub const fn with_margin_of_safety(mut self, margin_of_safety: f64) -> Self {
        self.margin_of_safety = margin_of_safety;
        self
    }

    /// Sets the discount rate.
    #[must_use]
    pub const fn with_discount_rate(mut self, discount_rate: f64) -> Self {
        self.discount_rate = discount_rate;
        self
    }

    /// Sets the growth decay rate.
    #[must_use]
    pub const fn with_growth_decay_rate(mut self, growth_decay_rate: f64) -> Self {
        self.growth_decay_rate = growth_decay_rate;
        self
    }

    /// Sets the terminal multiplier.
    #[must_use]
    pub const fn with_terminal_multiplier(mut self, terminal_multiplier: f64) -> Self {
        self.terminal_multiplier = terminal_multiplier;
        self
    }

    /// Growth rate after applying the margin of safety.
    #[must_use]
    pub fn safe_growth(&self, growth_rate: f64) -> f64 {
        growth_rate * (1.0 - self.margin_of_safety)
    }

    /// Checks every parameter is in range.
    ///
    /// A zero discount rate is accepted here; models that divide by it report
    /// themselves as not computable instead.
    pub fn validate(&self) -> Result<()> {
        if !self.margin_of_safety.is_finite() || !(0.0..1.0).contains(&self.margin_of_safety) {
            return Err(ValuationError::InvalidParameter(format!(
                "margin_of_safety must be in [0, 1), got {}",
                self.margin_of_safety
            )));
        }
        if !self.discount_rate.is_finite() || self.discount_rate <= -1.0 {
            return Err(ValuationError::InvalidParameter(format!(
                "discount_rate must be finite and greater than -1, got {}",
                self.discount_rate
            )));
        }
        if !self.growth_decay_rate.is_finite() || !(0.0..=1.0).contains(&self.growth_decay_rate) {
            return Err(ValuationError::InvalidParameter(format!(
                "growth_decay_rate must be in [0, 1], got {}",
                self.growth_decay_rate
            )));
        }
        if !self.terminal_multiplier.is_finite() || self.terminal_multiplier < 0.0 {
            return Err(ValuationError::InvalidParameter(format!(
                "terminal_multiplier must be finite and non-negative, got {}",
                self.terminal_multiplier
            )));
        }
        Ok(())
    }
}
