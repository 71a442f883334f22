//! Flat tabular output of a batch.

use std::{fs::File, path::Path};

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::info;

use valuation_core::{Field, Model, Result, ValuationError, ValuationRecord};

/// Text written for absent values in CSV output.
pub const CSV_NULL: &str = "NA";

/// Output format of a written table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated values, nulls as [`CSV_NULL`].
    Csv,
    /// Apache Parquet.
    Parquet,
}

impl OutputFormat {
    /// Infers the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::InvalidParameter`] for unknown extensions.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("csv") => Ok(Self::Csv),
            Some("parquet") | Some("pq") => Ok(Self::Parquet),
            _ => Err(ValuationError::InvalidParameter(format!(
                "Unsupported output file {}. Supported extensions: csv, parquet",
                path.display()
            ))),
        }
    }
}

/// The records of a batch, one row per record.
///
/// Columns, in order: `ticker`, `price`, `quote_date`, `<model>_valuation` and
/// `<model>_value_return` for each model, then one column per [`Field`].
/// Everything absent is null.
#[derive(Clone, Debug, PartialEq)]
pub struct ValuationTable {
    records: Vec<ValuationRecord>,
}

impl ValuationTable {
    /// Creates a table from records.
    #[must_use]
    pub const fn new(records: Vec<ValuationRecord>) -> Self {
        Self { records }
    }

    /// The records, in row order.
    #[must_use]
    pub fn records(&self) -> &[ValuationRecord] {
        &self.records
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column names in output order.
    #[must_use]
    pub fn column_names() -> Vec<String> {
        let mut names = vec![
            "ticker".to_string(),
            "price".to_string(),
            "quote_date".to_string(),
        ];
        names.extend(Model::ALL.iter().map(|m| format!("{}_valuation", m.name())));
        names.extend(Model::ALL.iter().map(|m| format!("{}_value_return", m.name())));
        names.extend(Field::ALL.iter().map(|f| f.column().to_string()));
        names
    }

    /// Builds the polars [`DataFrame`].
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::Other`] if polars rejects the columns.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let tickers: Vec<&str> = self.records.iter().map(|r| r.symbol().as_str()).collect();
        let prices: Vec<Option<f64>> = self.records.iter().map(|r| r.quote().price).collect();
        // a quote date is only meaningful alongside a price
        let dates: Vec<Option<i32>> = self
            .records
            .iter()
            .map(|r| r.quote().price.map(|_| days_since_epoch(r.quote().date)))
            .collect();

        let date_col = Column::new("quote_date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| ValuationError::Other(e.to_string()))?;

        let mut columns = vec![
            Column::new("ticker".into(), tickers),
            Column::new("price".into(), prices),
            date_col,
        ];

        for model in Model::ALL {
            let values: Vec<Option<f64>> =
                self.records.iter().map(|r| r.valuation(model)).collect();
            columns.push(Column::new(
                format!("{}_valuation", model.name()).into(),
                values,
            ));
        }
        for model in Model::ALL {
            let values: Vec<Option<f64>> =
                self.records.iter().map(|r| r.value_return(model)).collect();
            columns.push(Column::new(
                format!("{}_value_return", model.name()).into(),
                values,
            ));
        }
        for field in Field::ALL {
            let values: Vec<Option<f64>> = self.records.iter().map(|r| r.field(field)).collect();
            columns.push(Column::new(field.column().into(), values));
        }

        DataFrame::new(columns).map_err(|e| ValuationError::Other(e.to_string()))
    }

    /// Writes the table, choosing the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::InvalidParameter`] for unknown extensions and
    /// [`ValuationError::Io`] if the file cannot be written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = OutputFormat::from_path(path)?;
        let mut df = self.to_dataframe()?;
        let file = File::create(path)?;

        match format {
            OutputFormat::Csv => CsvWriter::new(file)
                .include_header(true)
                .with_null_value(CSV_NULL.to_string())
                .finish(&mut df)
                .map_err(|e| ValuationError::Io(e.to_string()))?,
            OutputFormat::Parquet => {
                ParquetWriter::new(file)
                    .finish(&mut df)
                    .map_err(|e| ValuationError::Io(e.to_string()))?;
            }
        }

        info!(path = %path.display(), rows = df.height(), ?format, "Wrote table");
        Ok(())
    }
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    // NaiveDate::default() is 1970-01-01
    (date - NaiveDate::default()).num_days() as i32
}
