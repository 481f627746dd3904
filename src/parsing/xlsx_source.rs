use std::io::Cursor;
use std::sync::Arc;

use calamine::{Data, Range, Reader, Xlsx};
use chrono::NaiveTime;
use tracing::debug;

use super::{canonical_header, Row, RowSource};
use crate::errors::IngestError;

/// First worksheet of an Office Open XML workbook.
///
/// Cells are rendered as text the way a spreadsheet would display them:
/// whole numbers without a decimal point, dates as `YYYY-MM-DD`, and
/// error or empty cells as "". Short rows are padded to the header width.
pub struct XlsxRowSource {
    range: Range<Data>,
    header: Arc<[String]>,
    first_row: usize,
    next: usize,
}

impl XlsxRowSource {
    pub fn new(bytes: &[u8]) -> Result<Self, IngestError> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| IngestError::Source("xlsx has no sheets".to_string()))??;

        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or_default();
        let mut header: Vec<String> = (0..range.width())
            .map(|col| range.get((0, col)).map(cell_text).unwrap_or_default())
            .map(|raw| canonical_header(&raw))
            .collect();
        while header.last().is_some_and(|h| h.is_empty()) {
            header.pop();
        }
        debug!(columns = header.len(), rows = range.height(), "read xlsx header");

        Ok(Self {
            range,
            header: header.into(),
            first_row,
            next: 1,
        })
    }
}

impl RowSource for XlsxRowSource {
    fn header(&self) -> &[String] {
        &self.header
    }

    fn next_row(&mut self) -> Result<Option<Row>, IngestError> {
        if self.header.is_empty() || self.next >= self.range.height() {
            return Ok(None);
        }

        let idx = self.next;
        self.next += 1;

        let values = (0..self.header.len())
            .map(|col| {
                self.range
                    .get((idx, col))
                    .map(cell_text)
                    .unwrap_or_default()
                    .trim()
                    .to_string()
            })
            .collect();

        Ok(Some(Row::new(
            self.first_row + idx + 1,
            self.header.clone(),
            values,
        )))
    }

    fn skipped_rows(&self) -> usize {
        0
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            (*f as i64).to_string()
        }
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if ts.time() == NaiveTime::MIN => ts.format("%Y-%m-%d").to_string(),
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
    }
}
