use std::sync::Arc;

use csv::{ByteRecord, ReaderBuilder, Trim};
use tracing::{debug, warn};

use super::{canonical_header, Row, RowSource};
use crate::errors::{IngestError, RowIssue};

/// Comma-delimited text with a header line.
pub struct CsvRowSource<'a> {
    reader: csv::Reader<&'a [u8]>,
    header: Arc<[String]>,
    record: ByteRecord,
    skipped: usize,
}

impl<'a> CsvRowSource<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self, IngestError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(bytes);

        let mut record = ByteRecord::new();
        let header: Vec<String> = if reader.read_byte_record(&mut record)? {
            record
                .iter()
                .map(|field| canonical_header(&String::from_utf8_lossy(field)))
                .collect()
        } else {
            Vec::new()
        };
        debug!(columns = header.len(), "read csv header");

        Ok(Self {
            reader,
            header: header.into(),
            record,
            skipped: 0,
        })
    }

    fn line(&self) -> usize {
        self.record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or_default()
    }

    fn decode(&self) -> Option<Vec<String>> {
        self.record
            .iter()
            .map(|field| std::str::from_utf8(field).ok().map(|s| s.trim().to_string()))
            .collect()
    }
}

impl RowSource for CsvRowSource<'_> {
    fn header(&self) -> &[String] {
        &self.header
    }

    fn next_row(&mut self) -> Result<Option<Row>, IngestError> {
        if self.header.is_empty() {
            return Ok(None);
        }

        while self.reader.read_byte_record(&mut self.record)? {
            let line = self.line();

            if self.record.len() != self.header.len() {
                let issue = RowIssue::MalformedRow {
                    expected: self.header.len(),
                    found: self.record.len(),
                };
                warn!(row = line, %issue, "skipping csv row");
                self.skipped += 1;
                continue;
            }

            let Some(values) = self.decode() else {
                warn!(row = line, "skipping csv row with invalid UTF-8");
                self.skipped += 1;
                continue;
            };

            return Ok(Some(Row::new(line, self.header.clone(), values)));
        }

        Ok(None)
    }

    fn skipped_rows(&self) -> usize {
        self.skipped
    }
}
