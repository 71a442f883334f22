//! The per-ticker valuation record.
//!
//! A [`ValuationRecord`] is built in stages. Each stage consumes the record and
//! returns an extended copy, so a record seen after any stage is complete for
//! that stage and nothing outside the pipeline can mutate it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Field, FieldSet, MissingReason, Model, Quote, Symbol};

/// A non-fatal observation made while valuing a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordNote {
    /// The model the note concerns.
    pub model: Model,
    /// What was observed.
    pub message: String,
}

/// Raw fields, computed valuations and implied returns for one ticker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValuationRecord {
    symbol: Symbol,
    as_of: NaiveDate,
    quote: Quote,
    fields: FieldSet,
    valuations: BTreeMap<Model, f64>,
    not_computable: BTreeMap<Model, String>,
    notes: Vec<RecordNote>,
    value_returns: BTreeMap<Model, f64>,
}

impl ValuationRecord {
    /// Creates an empty record: no price, every field not yet fetched.
    #[must_use]
    pub fn new(symbol: Symbol, as_of: NaiveDate) -> Self {
        Self {
            symbol,
            as_of,
            quote: Quote::unavailable(as_of),
            fields: FieldSet::default(),
            valuations: BTreeMap::new(),
            not_computable: BTreeMap::new(),
            notes: Vec::new(),
            value_returns: BTreeMap::new(),
        }
    }

    /// Creates the record of a ticker whose data could not be obtained at all.
    #[must_use]
    pub fn unavailable(symbol: Symbol, as_of: NaiveDate, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut record = Self::new(symbol, as_of)
            .with_fields(FieldSet::all_missing(MissingReason::FetchFailed(reason.clone())));
        for model in Model::ALL {
            record = record.with_not_computable(model, reason.clone());
        }
        record
    }

    /// Extraction stage: stores the quote and the field set.
    #[must_use]
    pub fn with_extraction(mut self, quote: Option<Quote>, fields: FieldSet) -> Self {
        if let Some(quote) = quote {
            self.quote = quote;
        }
        self.fields = fields;
        self
    }

    /// Replaces the field set.
    #[must_use]
    pub fn with_fields(mut self, fields: FieldSet) -> Self {
        self.fields = fields;
        self
    }

    /// Valuation stage: stores one model's per-share value.
    ///
    /// A non-finite value is recorded as not computable instead.
    #[must_use]
    pub fn with_valuation(mut self, model: Model, value: f64) -> Self {
        if value.is_finite() {
            self.not_computable.remove(&model);
            self.valuations.insert(model, value);
            self
        } else {
            self.with_not_computable(model, format!("non-finite result {value}"))
        }
    }

    /// Valuation stage: records why a model produced no value.
    #[must_use]
    pub fn with_not_computable(mut self, model: Model, reason: impl Into<String>) -> Self {
        self.valuations.remove(&model);
        self.value_returns.remove(&model);
        self.not_computable.insert(model, reason.into());
        self
    }

    /// Attaches a non-fatal note about a model. Repeated notes are kept once.
    #[must_use]
    pub fn with_note(mut self, model: Model, message: impl Into<String>) -> Self {
        let note = RecordNote {
            model,
            message: message.into(),
        };
        if !self.notes.contains(&note) {
            self.notes.push(note);
        }
        self
    }

    /// Return stage: stores implied returns.
    ///
    /// Entries are kept only for models that have a valuation while the quote
    /// has a positive finite price, and only when the return itself is finite.
    #[must_use]
    pub fn with_value_returns<I>(mut self, returns: I) -> Self
    where
        I: IntoIterator<Item = (Model, f64)>,
    {
        self.value_returns.clear();
        if self.quote.usable_price().is_none() {
            return self;
        }
        for (model, value_return) in returns {
            if self.valuations.contains_key(&model) && value_return.is_finite() {
                self.value_returns.insert(model, value_return);
            }
        }
        self
    }

    /// The ticker.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// The date the record was evaluated.
    #[must_use]
    pub const fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// The quote used for returns.
    #[must_use]
    pub const fn quote(&self) -> &Quote {
        &self.quote
    }

    /// The extracted fields.
    #[must_use]
    pub const fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Shortcut for a field's numeric value.
    #[must_use]
    pub fn field(&self, field: Field) -> Option<f64> {
        self.fields.value(field)
    }

    /// A model's per-share value, if it was computable.
    #[must_use]
    pub fn valuation(&self, model: Model) -> Option<f64> {
        self.valuations.get(&model).copied()
    }

    /// All computed valuations.
    #[must_use]
    pub const fn valuations(&self) -> &BTreeMap<Model, f64> {
        &self.valuations
    }

    /// Why a model produced no value, if it was attempted and failed.
    #[must_use]
    pub fn not_computable(&self, model: Model) -> Option<&str> {
        self.not_computable.get(&model).map(String::as_str)
    }

    /// A model's implied return, if present.
    #[must_use]
    pub fn value_return(&self, model: Model) -> Option<f64> {
        self.value_returns.get(&model).copied()
    }

    /// All implied returns.
    #[must_use]
    pub const fn value_returns(&self) -> &BTreeMap<Model, f64> {
        &self.value_returns
    }

    /// Non-fatal notes attached while valuing.
    #[must_use]
    pub fn notes(&self) -> &[RecordNote] {
        &self.notes
    }

    /// Returns true if the record carries no price, field or valuation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quote.price.is_none() && self.fields.present_count() == 0 && self.valuations.is_empty()
    }
}
