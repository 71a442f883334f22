//! Core data types for equity valuation.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`Quote`] - Current price and its date
//! - [`Field`] - The ten recognized financial fields
//! - [`HistoricalMetric`] - Series a source can return oldest-to-newest
//! - [`RawField`] / [`RawSeries`] - Unparsed values as returned by a source
//! - [`FieldValue`] / [`MissingReason`] - Typed presence or absence of a value
//! - [`FieldSet`] - Exactly one [`FieldValue`] per [`Field`]
//! - [`Model`] - The three valuation models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValuationError;

/// A trading symbol/ticker.
///
/// Symbols are trimmed and uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Current market price of a symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Last traded price, absent when the source had none.
    pub price: Option<f64>,
    /// Date the price refers to.
    pub date: NaiveDate,
}

impl Quote {
    /// Creates a quote with a price.
    #[must_use]
    pub const fn new(price: f64, date: NaiveDate) -> Self {
        Self {
            price: Some(price),
            date,
        }
    }

    /// Creates a quote without a price.
    #[must_use]
    pub const fn unavailable(date: NaiveDate) -> Self {
        Self { price: None, date }
    }

    /// Returns the price if it is a positive finite number.
    #[must_use]
    pub fn usable_price(&self) -> Option<f64> {
        self.price.filter(|p| p.is_finite() && *p > 0.0)
    }
}

/// Historical series a source can provide, ordered oldest to newest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoricalMetric {
    /// Period price/earnings ratios; the last entry is the current (TTM) period.
    PriceEarnings,
    /// Period return on equity; the last entry is the current (TTM) period.
    ReturnOnEquity,
}

impl HistoricalMetric {
    /// Returns the snake_case name of the metric.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PriceEarnings => "price_earnings",
            Self::ReturnOnEquity => "return_on_equity",
        }
    }
}

impl fmt::Display for HistoricalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the value of a [`Field`] comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldOrigin {
    /// A single value fetched with `fetch_field`.
    Point,
    /// An aggregate of a historical series.
    Series(HistoricalMetric),
}

/// The ten financial fields recognized by the valuation engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Trailing twelve months earnings per share.
    Eps,
    /// Expected annual growth rate over the next five years, as a fraction.
    GrowthRate,
    /// Median of the last five completed periods' P/E ratios.
    MedianHistoricalPe,
    /// Cash and cash equivalents.
    CashAndEquivalents,
    /// Total liabilities.
    TotalLiabilities,
    /// Total shareholders' equity.
    ShareholdersEquity,
    /// Free cash flow.
    FreeCashFlow,
    /// Shares outstanding.
    SharesOutstanding,
    /// Dividend per share.
    DividendPerShare,
    /// Average return on equity over a four-period historical window.
    ReturnOnEquity5y,
}

impl Field {
    /// Number of recognized fields.
    pub const COUNT: usize = 10;

    /// All fields in output column order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Eps,
        Self::GrowthRate,
        Self::MedianHistoricalPe,
        Self::CashAndEquivalents,
        Self::TotalLiabilities,
        Self::ShareholdersEquity,
        Self::FreeCashFlow,
        Self::SharesOutstanding,
        Self::DividendPerShare,
        Self::ReturnOnEquity5y,
    ];

    /// Position of the field in [`Field::ALL`].
    #[must_use]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Column name used in tabular output.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Eps => "eps",
            Self::GrowthRate => "growth_rate",
            Self::MedianHistoricalPe => "median_historical_pe",
            Self::CashAndEquivalents => "cash_and_equivalents",
            Self::TotalLiabilities => "total_liabilities",
            Self::ShareholdersEquity => "shareholders_equity",
            Self::FreeCashFlow => "free_cash_flow",
            Self::SharesOutstanding => "shares_outstanding",
            Self::DividendPerShare => "dividend_per_share",
            Self::ReturnOnEquity5y => "return_on_equity_5y",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Eps => "EPS",
            Self::GrowthRate => "Growth Rate",
            Self::MedianHistoricalPe => "Median Historical P/E",
            Self::CashAndEquivalents => "Cash and Cash Equivalents",
            Self::TotalLiabilities => "Total Liabilities",
            Self::ShareholdersEquity => "Shareholders' Equity",
            Self::FreeCashFlow => "Free Cash Flow",
            Self::SharesOutstanding => "Shares Outstanding",
            Self::DividendPerShare => "Dividend Per Share",
            Self::ReturnOnEquity5y => "Return on Equity 5-yr",
        }
    }

    /// Where the field's value is obtained from.
    #[must_use]
    pub const fn origin(&self) -> FieldOrigin {
        match self {
            Self::MedianHistoricalPe => FieldOrigin::Series(HistoricalMetric::PriceEarnings),
            Self::ReturnOnEquity5y => FieldOrigin::Series(HistoricalMetric::ReturnOnEquity),
            _ => FieldOrigin::Point,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An unparsed value returned by a source, with the factor that converts it
/// to the engine's units (fractions for rates, absolute amounts for money).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawField {
    /// The raw text as scraped or decoded.
    pub text: String,
    /// Multiplier applied after a successful numeric conversion.
    pub scale: f64,
}

impl RawField {
    /// Creates a raw value already expressed in engine units.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            scale: 1.0,
        }
    }

    /// Sets the unit conversion factor (e.g. `0.01` for percentages, `1e6` for millions).
    #[must_use]
    pub const fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

/// An unparsed historical series, ordered oldest to newest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    /// Raw period values.
    pub values: Vec<String>,
    /// Multiplier applied to each successfully converted value.
    pub scale: f64,
}

impl RawSeries {
    /// Creates a series already expressed in engine units.
    #[must_use]
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            scale: 1.0,
        }
    }

    /// Sets the unit conversion factor.
    #[must_use]
    pub const fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Returns the number of raw entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the series has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for RawSeries {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

/// Why a field has no value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingReason {
    /// Extraction has not run yet.
    NotFetched,
    /// The source answered but had no value for the field.
    Unavailable,
    /// The source returned text that is not a number.
    Unparsable(String),
    /// The historical series did not have enough numeric periods.
    InsufficientHistory,
    /// The request for the field failed.
    FetchFailed(String),
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFetched => f.write_str("not fetched"),
            Self::Unavailable => f.write_str("unavailable from source"),
            Self::Unparsable(raw) => write!(f, "could not parse {raw:?} as a number"),
            Self::InsufficientHistory => f.write_str("insufficient history"),
            Self::FetchFailed(e) => write!(f, "fetch failed: {e}"),
        }
    }
}

/// A field's value or the typed reason it is absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// A finite numeric value in engine units.
    Present(f64),
    /// No value; never treated as zero.
    Missing(MissingReason),
}

impl FieldValue {
    /// Returns the value if present.
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        match self {
            Self::Present(v) => Some(*v),
            Self::Missing(_) => None,
        }
    }

    /// Returns true if the value is present.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Returns the reason the value is missing, if it is.
    #[must_use]
    pub const fn missing_reason(&self) -> Option<&MissingReason> {
        match self {
            Self::Present(_) => None,
            Self::Missing(reason) => Some(reason),
        }
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Self::Present(v),
            Some(v) => Self::Missing(MissingReason::Unparsable(v.to_string())),
            None => Self::Missing(MissingReason::Unavailable),
        }
    }
}

/// Exactly one [`FieldValue`] for each of the ten [`Field`]s.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSet {
    values: [FieldValue; Field::COUNT],
}

impl FieldSet {
    /// Creates a set where every field is missing for the given reason.
    #[must_use]
    pub fn all_missing(reason: MissingReason) -> Self {
        Self {
            values: std::array::from_fn(|_| FieldValue::Missing(reason.clone())),
        }
    }

    /// Sets one field, consuming and returning the set.
    #[must_use]
    pub fn with(mut self, field: Field, value: FieldValue) -> Self {
        self.values[field.index()] = value;
        self
    }

    /// Sets a field to a present value.
    ///
    /// Non-finite values are recorded as missing.
    #[must_use]
    pub fn with_value(self, field: Field, value: f64) -> Self {
        self.with(field, FieldValue::from(Some(value)))
    }

    /// Returns the entry for a field.
    #[must_use]
    pub fn get(&self, field: Field) -> &FieldValue {
        &self.values[field.index()]
    }

    /// Returns the numeric value of a field if present.
    #[must_use]
    pub fn value(&self, field: Field) -> Option<f64> {
        self.get(field).value()
    }

    /// Iterates over all fields in column order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        Field::ALL.iter().copied().zip(self.values.iter())
    }

    /// Returns the number of fields with a present value.
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_present()).count()
    }
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::all_missing(MissingReason::NotFetched)
    }
}

impl FromIterator<(Field, FieldValue)> for FieldSet {
    fn from_iter<I: IntoIterator<Item = (Field, FieldValue)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::default(), |set, (field, value)| set.with(field, value))
    }
}

/// The three valuation models.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    /// Earnings multiple.
    Pe,
    /// Discounted cash flow.
    Dcf,
    /// Return on equity.
    Roe,
}

impl Model {
    /// All models in output column order.
    pub const ALL: [Self; 3] = [Self::Pe, Self::Dcf, Self::Roe];

    /// Short lowercase name (`pe`, `dcf`, `roe`).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pe => "pe",
            Self::Dcf => "dcf",
            Self::Roe => "roe",
        }
    }

    /// Display label (`P/E`, `DCF`, `ROE`).
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pe => "P/E",
            Self::Dcf => "DCF",
            Self::Roe => "ROE",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Model {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pe" | "p/e" => Ok(Self::Pe),
            "dcf" => Ok(Self::Dcf),
            "roe" => Ok(Self::Roe),
            other => Err(ValuationError::InvalidParameter(format!(
                "Unknown valuation model: {other}. Supported: pe, dcf, roe"
            ))),
        }
    }
}
