//! Aggregation of historical series into single fields.

use valuation_core::{FieldValue, MissingReason, RawSeries};

use crate::parse::parse_number;

/// Number of completed periods the historical P/E median looks back over.
pub const PE_LOOKBACK: usize = 5;

/// Offset from the end of the ROE series where the averaging window starts.
pub const ROE_WINDOW_START: usize = 6;

/// Offset from the end of the ROE series where the averaging window stops (exclusive).
pub const ROE_WINDOW_END: usize = 2;

/// Median of a slice, averaging the two middle values for even lengths.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Arithmetic mean of a slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median P/E over the last [`PE_LOOKBACK`] completed periods.
///
/// The newest raw entry is the current, partial period and is dropped before
/// parsing. Unparsable entries are skipped; fewer than five remaining values
/// uses all of them.
#[must_use]
pub fn median_historical_pe(series: &RawSeries) -> FieldValue {
    let completed = match series.values.split_last() {
        Some((_, completed)) => completed,
        None => return FieldValue::Missing(MissingReason::InsufficientHistory),
    };

    let ratios: Vec<f64> = completed
        .iter()
        .filter_map(|raw| parse_number(raw, series.scale))
        .collect();
    let recent = &ratios[ratios.len().saturating_sub(PE_LOOKBACK)..];

    median(recent).map_or(
        FieldValue::Missing(MissingReason::InsufficientHistory),
        FieldValue::Present,
    )
}

/// Average ROE over the window `[len - 6, len - 2)` of the parsed series.
///
/// Unparsable entries are skipped before the window is taken. The window
/// excludes the current period and the one before it; a series shorter than
/// six values yields a correspondingly shorter window.
#[must_use]
pub fn five_year_roe(series: &RawSeries) -> FieldValue {
    let values: Vec<f64> = series
        .values
        .iter()
        .filter_map(|raw| parse_number(raw, series.scale))
        .collect();

    let start = values.len().saturating_sub(ROE_WINDOW_START);
    let end = values.len().saturating_sub(ROE_WINDOW_END);
    let window = if start < end { &values[start..end] } else { &[][..] };

    mean(window).map_or(
        FieldValue::Missing(MissingReason::InsufficientHistory),
        FieldValue::Present,
    )
}
