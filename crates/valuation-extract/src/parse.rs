//! Numeric parsing of scraped strings.

use valuation_core::{FieldValue, MissingReason, RawField};

/// Converts scraped text to a number.
///
/// Surrounding whitespace, thousands separators and a trailing `%` are
/// removed before conversion. Empty, non-numeric and non-finite text yields
/// `None`. `scale` is applied only after a successful conversion.
#[must_use]
pub fn parse_number(text: &str, scale: f64) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.strip_suffix('%').unwrap_or(&cleaned).trim_end();

    if cleaned.is_empty() {
        return None;
    }

    let value = cleaned.parse::<f64>().ok().filter(|v| v.is_finite())?;
    let scaled = value * scale;
    scaled.is_finite().then_some(scaled)
}

/// Parses a raw field into a [`FieldValue`].
#[must_use]
pub fn parse_field(raw: &RawField) -> FieldValue {
    match parse_number(&raw.text, raw.scale) {
        Some(value) => FieldValue::Present(value),
        None => FieldValue::Missing(MissingReason::Unparsable(raw.text.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_number("6.13", 1.0), Some(6.13));
        assert_eq!(parse_number("-0.42", 1.0), Some(-0.42));
        assert_eq!(parse_number("  17 ", 1.0), Some(17.0));
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(parse_number("1,234,567", 1.0), Some(1_234_567.0));
        assert_eq!(parse_number("12,345.5", 1e6), Some(12_345.5e6));
    }

    #[test]
    fn test_percentages() {
        let v = parse_number("12.50%", 0.01).unwrap();
        assert!((v - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_unparsable_is_none() {
        assert_eq!(parse_number("", 1.0), None);
        assert_eq!(parse_number("   ", 1.0), None);
        assert_eq!(parse_number("—", 1.0), None);
        assert_eq!(parse_number("N/A", 1.0), None);
        assert_eq!(parse_number("nan", 1.0), None);
        assert_eq!(parse_number("inf", 1.0), None);
        assert_eq!(parse_number("%", 0.01), None);
    }

    #[test]
    fn test_parse_field_missing_not_zero() {
        let value = parse_field(&RawField::new(""));
        assert_eq!(
            value,
            FieldValue::Missing(MissingReason::Unparsable(String::new()))
        );
        assert_eq!(value.value(), None);

        let value = parse_field(&RawField::new("abc"));
        assert!(!value.is_present());
    }

    #[test]
    fn test_parse_field_scaled() {
        let value = parse_field(&RawField::new("1,500").scaled(1e6));
        assert_eq!(value, FieldValue::Present(1.5e9));
    }
}
