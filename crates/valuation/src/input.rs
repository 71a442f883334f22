//! Ticker lists read from files.

use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use valuation_core::{Result, Symbol, ValuationError};

/// Column looked up in CSV ticker files when none is named.
pub const DEFAULT_TICKER_COLUMN: &str = "ticker";

/// Trims a ticker, removes an exchange suffix such as `" US"` and upper-cases it.
///
/// The suffix is matched case-insensitively. Returns `None` for tickers that
/// are empty once trimmed.
#[must_use]
pub fn normalize_ticker(raw: &str, strip_suffix: Option<&str>) -> Option<Symbol> {
    let upper = raw.trim().to_uppercase();
    let mut ticker = upper.as_str();
    if let Some(suffix) = strip_suffix.filter(|s| !s.trim().is_empty()) {
        ticker = ticker
            .strip_suffix(suffix.to_uppercase().as_str())
            .unwrap_or(ticker)
            .trim();
    }
    (!ticker.is_empty()).then(|| Symbol::new(ticker))
}

/// Reads tickers from a file.
///
/// `.csv` files are read with polars and the tickers taken from `column`
/// (matched case-insensitively, [`DEFAULT_TICKER_COLUMN`] when `None`). Any
/// other file holds one ticker per line; blank lines and lines starting with
/// `#` are skipped.
///
/// # Errors
///
/// Returns [`ValuationError::Io`] if the file cannot be read and
/// [`ValuationError::InvalidParameter`] if the CSV has no such column.
pub fn read_tickers(
    path: impl AsRef<Path>,
    column: Option<&str>,
    strip_suffix: Option<&str>,
) -> Result<Vec<Symbol>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let raw = if is_csv {
        read_csv_column(path, column.unwrap_or(DEFAULT_TICKER_COLUMN))?
    } else {
        std::fs::read_to_string(path)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect()
    };

    let symbols: Vec<Symbol> = raw
        .iter()
        .filter_map(|t| normalize_ticker(t, strip_suffix))
        .collect();
    debug!(path = %path.display(), count = symbols.len(), "Read tickers");
    Ok(symbols)
}

fn read_csv_column(path: &Path, column: &str) -> Result<Vec<String>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| ValuationError::Io(format!("{}: {e}", path.display())))?;

    let name = df
        .get_column_names()
        .into_iter()
        .find(|n| n.as_str().eq_ignore_ascii_case(column))
        .cloned()
        .ok_or_else(|| {
            ValuationError::InvalidParameter(format!(
                "No column {column:?} in {}",
                path.display()
            ))
        })?;

    let values = df
        .column(name.as_str())
        .and_then(|c| c.cast(&DataType::String))
        .map_err(|e| ValuationError::Other(e.to_string()))?;
    let values = values
        .str()
        .map_err(|e| ValuationError::Other(e.to_string()))?;

    Ok(values.into_iter().flatten().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("valuation-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" aapl ", None), Some(Symbol::new("AAPL")));
        assert_eq!(
            normalize_ticker("X US", Some(" US")),
            Some(Symbol::new("X"))
        );
        assert_eq!(
            normalize_ticker("MSFT", Some(" US")),
            Some(Symbol::new("MSFT"))
        );
        assert_eq!(
            normalize_ticker("vale us ", Some(" US")),
            Some(Symbol::new("VALE"))
        );
        assert_eq!(normalize_ticker("   ", None), None);
    }

    #[test]
    fn test_read_text_list() {
        let path = temp_file("tickers.txt", "# holdings\naapl\n\n msft \nvale us\n");
        let tickers = read_tickers(&path, None, Some(" us")).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(
            tickers,
            vec![Symbol::new("AAPL"), Symbol::new("MSFT"), Symbol::new("VALE")]
        );
    }

    #[test]
    fn test_read_csv_column() {
        let path = temp_file(
            "holdings.csv",
            "Ticker,Name,Weight\nRIO US,Rio Tinto,0.1\nVALE US,Vale,0.2\n",
        );
        let tickers = read_tickers(&path, None, Some(" US")).unwrap();
        let missing = read_tickers(&path, Some("symbol"), None);
        std::fs::remove_file(&path).ok();

        assert_eq!(tickers, vec![Symbol::new("RIO"), Symbol::new("VALE")]);
        assert!(matches!(
            missing,
            Err(ValuationError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = read_tickers("/nonexistent/tickers.txt", None, None);
        assert!(matches!(result, Err(ValuationError::Io(_))));
    }
}
