//! Human-readable per-ticker report.

use valuation_core::{Field, FieldValue, Model, ValuationRecord};

/// How a field is displayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Style {
    Plain,
    Dollars,
    Percent,
    Thousands,
    DollarThousands,
}

const fn style(field: Field) -> Style {
    match field {
        Field::Eps | Field::MedianHistoricalPe => Style::Plain,
        Field::DividendPerShare => Style::Dollars,
        Field::GrowthRate | Field::ReturnOnEquity5y => Style::Percent,
        Field::SharesOutstanding => Style::Thousands,
        Field::CashAndEquivalents
        | Field::TotalLiabilities
        | Field::ShareholdersEquity
        | Field::FreeCashFlow => Style::DollarThousands,
    }
}

/// Inserts thousands separators into the integer part of a formatted number.
fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, digit) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match frac {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// `$1,234.50`, with the sign before the dollar.
#[must_use]
pub fn dollars(amount: f64) -> String {
    let grouped = group_thousands(&format!("{:.2}", amount.abs()));
    if amount < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// `12.50%` for `0.125`.
#[must_use]
pub fn percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// `15,334,099,968`, rounded to a whole number.
#[must_use]
pub fn thousands(amount: f64) -> String {
    group_thousands(&format!("{amount:.0}"))
}

fn format_field(field: Field, value: f64) -> String {
    match style(field) {
        Style::Plain => format!("{value:.2}"),
        Style::Dollars => dollars(value),
        Style::Percent => percent(value),
        Style::Thousands => thousands(value),
        Style::DollarThousands if value < 0.0 => format!("-${}", thousands(-value)),
        Style::DollarThousands => format!("${}", thousands(value)),
    }
}

/// Renders a record as a sectioned text block.
///
/// Sections are separated by a blank line and the text ends with a newline.
#[must_use]
pub fn render(record: &ValuationRecord) -> String {
    let mut lines = vec![format!("{} (as of {})", record.symbol(), record.as_of())];

    lines.push("QUOTE".to_string());
    lines.push(match record.quote().price {
        Some(price) => format!("Price as of {}: {}", record.quote().date, dollars(price)),
        None => "Price: n/a".to_string(),
    });
    lines.push(String::new());

    lines.push("VALUATION".to_string());
    for model in Model::ALL {
        match (record.valuation(model), record.not_computable(model)) {
            (Some(value), _) => lines.push(format!("{}: {}", model.label(), dollars(value))),
            (None, Some(reason)) => {
                lines.push(format!("{}: not computable ({reason})", model.label()));
            }
            (None, None) => {}
        }
    }
    lines.push(String::new());

    lines.push("VALUE RETURNS".to_string());
    lines.extend(Model::ALL.into_iter().filter_map(|model| {
        record
            .value_return(model)
            .map(|value_return| format!("{}: {}", model.label(), percent(value_return)))
    }));
    lines.push(String::new());

    lines.push("DATA".to_string());
    lines.extend(record.fields().iter().map(|(field, value)| match value {
        FieldValue::Present(v) => format!("{}: {}", field.label(), format_field(field, *v)),
        FieldValue::Missing(reason) => format!("{}: n/a ({reason})", field.label()),
    }));

    if !record.notes().is_empty() {
        lines.push(String::new());
        lines.push("NOTES".to_string());
        lines.extend(
            record
                .notes()
                .iter()
                .map(|note| format!("{}: {}", note.model.label(), note.message)),
        );
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use valuation_core::{FieldSet, Quote, Symbol};

    #[test]
    fn test_number_formats() {
        assert_eq!(dollars(76.752), "$76.75");
        assert_eq!(dollars(1234567.891), "$1,234,567.89");
        assert_eq!(dollars(-2.5), "-$2.50");
        assert_eq!(percent(0.125), "12.50%");
        assert_eq!(percent(-0.2), "-20.00%");
        assert_eq!(thousands(15_334_099_968.0), "15,334,099,968");
        assert_eq!(thousands(999.0), "999");
        assert_eq!(thousands(-1000.0), "-1,000");
    }

    #[test]
    fn test_render_unavailable_record() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let record =
            ValuationRecord::unavailable(Symbol::new("ZZZZ"), date, "Symbol not found: ZZZZ");

        let mut expected = String::from(
            "ZZZZ (as of 2024-06-28)\n\
             QUOTE\n\
             Price: n/a\n\
             \n\
             VALUATION\n\
             P/E: not computable (Symbol not found: ZZZZ)\n\
             DCF: not computable (Symbol not found: ZZZZ)\n\
             ROE: not computable (Symbol not found: ZZZZ)\n\
             \n\
             VALUE RETURNS\n\
             \n\
             DATA\n",
        );
        for field in Field::ALL {
            expected.push_str(&format!(
                "{}: n/a (fetch failed: Symbol not found: ZZZZ)\n",
                field.label()
            ));
        }

        assert_eq!(render(&record), expected);
    }

    #[test]
    fn test_render_sections() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let fields = FieldSet::default()
            .with_value(Field::Eps, 5.0)
            .with_value(Field::GrowthRate, 0.1)
            .with_value(Field::FreeCashFlow, 100e6);
        let record = ValuationRecord::new(Symbol::new("ACME"), date)
            .with_extraction(Some(Quote::new(50.0, date)), fields)
            .with_valuation(Model::Pe, 60.0)
            .with_not_computable(Model::Dcf, "missing cash")
            .with_value_returns([(Model::Pe, 0.2)])
            .with_note(Model::Pe, "EPS is negative");

        let text = render(&record);

        assert!(text.starts_with("ACME (as of 2024-06-28)\n"));
        assert!(text.contains("Price as of 2024-06-28: $50.00"));
        assert!(text.contains("P/E: $60.00"));
        assert!(text.contains("DCF: not computable (missing cash)"));
        assert!(text.contains("P/E: 20.00%"));
        assert!(text.contains("Growth Rate: 10.00%"));
        assert!(text.contains("Free Cash Flow: $100,000,000"));
        assert!(text.contains("NOTES\nP/E: EPS is negative"));
        assert!(!text.contains("ROE:"));
    }
}
