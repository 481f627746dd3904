//! Tabular row sources.
//!
//! Every supported file format is read through [`RowSource`]: the first
//! record is consumed as the header (canonicalised to trimmed lower case)
//! and the rest are yielded one at a time as [`Row`]s of trimmed values.

use std::path::Path;
use std::sync::Arc;

use crate::errors::IngestError;

pub mod csv_source;
pub mod xlsx_source;

pub use csv_source::CsvRowSource;
pub use xlsx_source::XlsxRowSource;

/// Formats an uploaded file can be read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Picks a format from the declared file name's extension.
    ///
    /// Legacy `.xls` workbooks are recognised but rejected with
    /// [`IngestError::NotImplemented`]; anything else is
    /// [`IngestError::UnsupportedFormat`].
    pub fn from_file_name(file_name: &str) -> Result<Self, IngestError> {
        let ext = Path::new(file_name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        match ext.as_str() {
            ".csv" => Ok(FileFormat::Csv),
            ".xlsx" => Ok(FileFormat::Xlsx),
            ".xls" => Err(IngestError::NotImplemented(ext)),
            _ => Err(IngestError::UnsupportedFormat(ext)),
        }
    }
}

/// Trimmed, lower-cased header name.
pub fn canonical_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// One data row, aligned with the source header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    number: usize,
    header: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    /// `values` must have exactly one entry per header column.
    pub fn new(number: usize, header: Arc<[String]>, values: Vec<String>) -> Self {
        debug_assert_eq!(header.len(), values.len());
        Self {
            number,
            header,
            values,
        }
    }

    /// 1-based position of the row in the source file, header included.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Value of the first column named `column`, or "" when the header has no such column.
    pub fn get(&self, column: &str) -> &str {
        self.header
            .iter()
            .position(|h| h == column)
            .and_then(|idx| self.values.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn value_at(&self, index: usize) -> &str {
        self.values.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|v| v.is_empty())
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// A single-pass reader over the data rows of one file.
pub trait RowSource: Send {
    /// Canonical header names, in file order.
    fn header(&self) -> &[String];

    /// Next row whose width matches the header. `Ok(None)` at end of input.
    fn next_row(&mut self) -> Result<Option<Row>, IngestError>;

    /// Rows dropped so far because they did not fit the header.
    fn skipped_rows(&self) -> usize;
}

/// Opens the row source matching `file_name`'s extension over `bytes`.
pub fn open_source<'a>(
    bytes: &'a [u8],
    file_name: &str,
) -> Result<Box<dyn RowSource + 'a>, IngestError> {
    match FileFormat::from_file_name(file_name)? {
        FileFormat::Csv => Ok(Box::new(CsvRowSource::new(bytes)?)),
        FileFormat::Xlsx => Ok(Box::new(XlsxRowSource::new(bytes)?)),
    }
}
