#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Intrinsic-value models.
//!
//! Three models turn a [`FieldSet`](valuation_core::FieldSet) into a per-share
//! value:
//!
//! - [`PeModel`] - five-year EPS projection at the median historical P/E
//! - [`DcfModel`] - ten-year free cash flow projection with a terminal multiple
//! - [`RoeModel`] - ten-year equity and dividend projection at the average ROE
//!
//! [`ValuationEngine`] runs them over a record and adds the implied return of
//! each value against the quoted price.

mod dcf;
mod engine;
mod error;
mod model;
mod pe;
mod returns;
mod roe;

pub use dcf::DcfModel;
pub use engine::ValuationEngine;
pub use error::ModelError;
pub use model::{ModelOutput, ModelWarning, ValuationModel};
pub use pe::PeModel;
pub use returns::{apply_value_returns, value_return};
pub use roe::{RoeBreakdown, RoeModel};
