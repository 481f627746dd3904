use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use super::classifier::ColumnClassification;
use super::IngestTarget;
use crate::errors::RowIssue;
use crate::parsing::Row;
use crate::repositories::NewTransactionRecord;

pub const ITEM_NUMBER: &str = "item number";
pub const TRANSACTION_TYPE: &str = "transaction type";
pub const ORDER_NUMBER: &str = "order number";
pub const DESCRIPTION: &str = "description";
pub const TRANSACTION_QUANTITY: &str = "transaction quantity";
pub const COMPLETED_QUANTITY: &str = "completed quantity";
pub const COMPLETED_DATE: &str = "completed date";

/// Columns the extractor reads by name. Always part of the known vocabulary.
pub const EXTRACTED_COLUMNS: [&str; 7] = [
    ITEM_NUMBER,
    TRANSACTION_TYPE,
    ORDER_NUMBER,
    DESCRIPTION,
    TRANSACTION_QUANTITY,
    COMPLETED_QUANTITY,
    COMPLETED_DATE,
];

/// Typed view of one data row. Lives only for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub row: usize,
    pub transaction_type: String,
    pub order_name: String,
    pub description: String,
    pub transaction_quantity: i32,
    pub completed_quantity: i32,
    pub completed_date: Option<NaiveDate>,
    /// Slash-joined non-empty location values
    pub location_key: String,
    /// Pipe-joined `Column=Value` pairs for the same values
    pub location_name_path: String,
    pub item_key: String,
}

impl TransactionDraft {
    pub fn into_record(
        self,
        target: &IngestTarget,
        location_id: Uuid,
        item_id: Uuid,
    ) -> NewTransactionRecord {
        NewTransactionRecord {
            company_id: target.company_id,
            warehouse_id: target.warehouse_id,
            location_id,
            transaction_file_id: target.transaction_file_id,
            item_id,
            transaction_type: self.transaction_type,
            order_name: self.order_name,
            description: self.description,
            transaction_quantity: self.transaction_quantity,
            completed_quantity: self.completed_quantity,
            completed_date: self.completed_date,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RowExtractor {
    date_format: String,
}

impl RowExtractor {
    pub fn new(date_format: impl Into<String>) -> Self {
        Self {
            date_format: date_format.into(),
        }
    }

    /// Builds a draft from `row`. Blank rows yield `None`.
    pub fn extract(&self, row: &Row, columns: &ColumnClassification) -> Option<TransactionDraft> {
        if row.is_blank() {
            return None;
        }

        let (location_key, location_name_path) = location_path(row, columns);

        Some(TransactionDraft {
            row: row.number(),
            transaction_type: row.get(TRANSACTION_TYPE).trim().to_string(),
            order_name: row.get(ORDER_NUMBER).trim().to_string(),
            description: row.get(DESCRIPTION).trim().to_string(),
            transaction_quantity: self.quantity(row, TRANSACTION_QUANTITY),
            completed_quantity: self.quantity(row, COMPLETED_QUANTITY),
            completed_date: self.completed_date(row),
            location_key,
            location_name_path,
            item_key: row.get(ITEM_NUMBER).trim().to_string(),
        })
    }

    fn quantity(&self, row: &Row, column: &'static str) -> i32 {
        let raw = row.get(column).trim();
        let (value, clean) = parse_leading_int(raw);
        if !clean {
            let issue = RowIssue::UnparseableValue {
                column,
                value: raw.to_string(),
            };
            debug!(row = row.number(), %issue, "using leading integer");
        }
        value
    }

    fn completed_date(&self, row: &Row) -> Option<NaiveDate> {
        let raw = row.get(COMPLETED_DATE).trim();
        if raw.is_empty() {
            return None;
        }
        // Dates must match the layout exactly, zero padding included.
        match NaiveDate::parse_from_str(raw, &self.date_format) {
            Ok(date) if date.format(&self.date_format).to_string() == raw => Some(date),
            _ => {
                let issue = RowIssue::UnparseableValue {
                    column: COMPLETED_DATE,
                    value: raw.to_string(),
                };
                debug!(row = row.number(), %issue, "treating as no date");
                None
            }
        }
    }
}

/// Slash path and pipe name path over the non-empty location values.
pub fn location_path(row: &Row, columns: &ColumnClassification) -> (String, String) {
    let mut path = Vec::new();
    let mut names = Vec::new();

    for column in columns.location_columns() {
        let value = row.value_at(column.index).trim();
        if value.is_empty() {
            continue;
        }
        path.push(value);
        names.push(format!("{}={}", title_case(&column.name), value));
    }

    (path.join("/"), names.join("|"))
}

/// Upper-cases every letter that follows a separator.
///
/// ASCII letters, digits and `_` are word characters, as are non-ASCII
/// letters and digits; other ASCII characters and Unicode whitespace
/// separate words. The rest of each word is left untouched.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev = ' ';
    for c in s.chars() {
        if is_separator(prev) {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev = c;
    }
    out
}

fn is_separator(c: char) -> bool {
    if c.is_ascii() {
        return !(c.is_ascii_alphanumeric() || c == '_');
    }
    if c.is_alphabetic() || c.is_numeric() {
        return false;
    }
    c.is_whitespace()
}

/// Leading signed decimal integer of `s`, or 0.
///
/// Returns whether the whole input was consumed; empty input counts as clean.
pub fn parse_leading_int(s: &str) -> (i32, bool) {
    let s = s.trim();
    if s.is_empty() {
        return (0, true);
    }

    let digits_start = usize::from(s.starts_with(['+', '-']));
    let digits_len = s[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return (0, false);
    }

    let end = digits_start + digits_len;
    match s[..end].parse::<i32>() {
        Ok(value) => (value, end == s.len()),
        Err(_) => (0, false),
    }
}
