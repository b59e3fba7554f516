//! CSV table reader with type inference and input validation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::DataError;
use crate::domain::{Column, Table};

/// Cell spellings read as missing values.
pub const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "-NaN", "n/a", "<NA>",
];

/// Byte-to-text decoding applied to every field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    /// Strict UTF-8; invalid sequences are an error.
    #[default]
    Utf8,
    /// ISO-8859-1: each byte is the code point of the same value.
    Latin1,
}

impl TextEncoding {
    fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// Reads a headed CSV file into a typed [`Table`].
///
/// Each column is inferred independently: numeric if every present cell
/// parses as a finite float, boolean if every present cell is `true`/`false`
/// (any case), categorical otherwise. A column with no present cells is numeric.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DataError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`DataError::CsvParse`] | Malformed CSV record |
/// | [`DataError::InvalidEncoding`] | Invalid UTF-8 under [`TextEncoding::Utf8`] |
/// | [`DataError::EmptyDataset`] | Zero data rows after header |
/// | [`DataError::InconsistentRowLength`] | Row has different column count than header |
/// | [`DataError::DuplicateColumn`] | Same header name appears twice |
pub struct TableReader {
    path: PathBuf,
    encoding: TextEncoding,
}

impl TableReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            encoding: TextEncoding::Utf8,
        }
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    fn csv_error(&self, e: csv::Error) -> DataError {
        DataError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn decode_record(&self, record: &csv::ByteRecord, row_index: usize) -> Result<Vec<String>, DataError> {
        record
            .iter()
            .map(|field| {
                self.encoding
                    .decode(field)
                    .ok_or_else(|| DataError::InvalidEncoding {
                        path: self.path.clone(),
                        row_index,
                    })
            })
            .collect()
    }

    /// Read and validate the CSV file.
    #[instrument(skip(self), fields(path = %self.path.display(), encoding = ?self.encoding))]
    pub fn read(&self) -> Result<Table, DataError> {
        let file = std::fs::File::open(&self.path).map_err(|e| DataError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so our own InconsistentRowLength check fires instead of CsvParse.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.byte_headers().map_err(|e| self.csv_error(e))?.clone();
        let names: Vec<String> = self
            .decode_record(&header, 0)?
            .into_iter()
            .map(|n| n.trim().to_string())
            .collect();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            if let Some(&first) = seen.get(name.as_str()) {
                return Err(DataError::DuplicateColumn {
                    name: name.clone(),
                    first,
                    second: i,
                });
            }
            seen.insert(name.as_str(), i);
        }
        let expected = names.len();
        debug!(expected, "read CSV header");

        let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); expected];
        let mut n_rows = 0usize;
        for (row_index, result) in rdr.byte_records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != expected {
                return Err(DataError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }
            for (col, field) in self.decode_record(&record, row_index)?.into_iter().enumerate() {
                let value = (!MISSING_TOKENS.contains(&field.trim())).then_some(field);
                raw[col].push(value);
            }
            n_rows += 1;
        }

        if n_rows == 0 {
            return Err(DataError::EmptyDataset {
                source_name: self.path.display().to_string(),
            });
        }

        let columns: Vec<Column> = raw.into_iter().map(infer_column).collect();
        for (name, column) in names.iter().zip(&columns) {
            debug!(column = %name, kind = column.kind(), missing = column.n_missing(), "column inferred");
        }
        let table = Table::new(names, columns)?;

        info!(n_rows, n_columns = table.n_columns(), "table loaded");
        Ok(table)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Narrowest column type that accepts every present cell.
fn infer_column(values: Vec<Option<String>>) -> Column {
    let present = || values.iter().flatten().map(|s| s.trim());
    if present().all(|s| parse_number(s).is_some()) {
        return Column::Numeric(
            values
                .iter()
                .map(|v| v.as_deref().and_then(|s| parse_number(s.trim())))
                .collect(),
        );
    }
    if present().all(|s| parse_bool(s).is_some()) {
        return Column::Boolean(
            values
                .iter()
                .map(|v| v.as_deref().and_then(|s| parse_bool(s.trim())))
                .collect(),
        );
    }
    Column::Categorical(values)
}
