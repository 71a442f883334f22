//! Implied return of a valuation against the market price.

use valuation_core::ValuationRecord;

/// `(value − price) / price`.
///
/// Absent when either side is absent, the price is not positive, or the result
/// is not finite.
#[must_use]
pub fn value_return(price: Option<f64>, value: Option<f64>) -> Option<f64> {
    let price = price.filter(|p| p.is_finite() && *p > 0.0)?;
    let value = value.filter(|v| v.is_finite())?;
    Some((value - price) / price).filter(|r| r.is_finite())
}

/// Return stage: computes the implied return of every valuation on the record.
#[must_use]
pub fn apply_value_returns(record: ValuationRecord) -> ValuationRecord {
    let price = record.quote().usable_price();
    let returns: Vec<_> = record
        .valuations()
        .iter()
        .filter_map(|(model, value)| value_return(price, Some(*value)).map(|r| (*model, r)))
        .collect();
    record.with_value_returns(returns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use valuation_core::{FieldSet, Model, Quote, Symbol};

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-12)
    }

    #[test]
    fn test_value_return() {
        assert!(close(value_return(Some(100.0), Some(120.0)), 0.2));
        assert!(close(value_return(Some(100.0), Some(80.0)), -0.2));
        assert_eq!(value_return(Some(0.0), Some(120.0)), None);
        assert_eq!(value_return(Some(-5.0), Some(120.0)), None);
        assert_eq!(value_return(None, Some(120.0)), None);
        assert_eq!(value_return(Some(100.0), None), None);
    }

    #[test]
    fn test_apply_value_returns() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let record = ValuationRecord::new(Symbol::new("ACME"), date)
            .with_extraction(Some(Quote::new(50.0, date)), FieldSet::default())
            .with_valuation(Model::Pe, 75.0)
            .with_not_computable(Model::Dcf, "missing free cash flow");

        let record = apply_value_returns(record);

        assert!(close(record.value_return(Model::Pe), 0.5));
        assert_eq!(record.value_return(Model::Dcf), None);
        assert_eq!(record.value_return(Model::Roe), None);
    }

    #[test]
    fn test_apply_value_returns_without_price() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let record = ValuationRecord::new(Symbol::new("ACME"), date).with_valuation(Model::Pe, 75.0);
        let record = apply_value_returns(record);
        assert!(record.value_returns().is_empty());
        assert_eq!(record.valuation(Model::Pe), Some(75.0));
    }
}
