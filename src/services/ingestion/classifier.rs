use std::collections::HashSet;

use crate::config::{IngestConfig, DEFAULT_KNOWN_COLUMNS};

/// The fixed set of transaction-attribute columns.
///
/// Any header not in the vocabulary is treated as a location-hierarchy
/// column. A misspelt known column therefore becomes a location level;
/// there is no way to tell the two apart from the header alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnVocabulary {
    known: HashSet<String>,
}

impl ColumnVocabulary {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            known: columns
                .into_iter()
                .map(|c| c.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(&config.known_columns)
    }

    /// Adds `columns` to the vocabulary.
    pub fn including<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.known
            .extend(columns.into_iter().map(|c| c.as_ref().trim().to_lowercase()));
        self
    }

    pub fn contains(&self, column: &str) -> bool {
        self.known.contains(column)
    }

    /// Splits `header` into known and location columns, preserving order.
    pub fn classify(&self, header: &[String]) -> ColumnClassification {
        let mut known = Vec::new();
        let mut location_columns = Vec::new();

        for (index, name) in header.iter().enumerate() {
            if self.contains(name) {
                known.push(name.clone());
            } else {
                location_columns.push(LocationColumn {
                    index,
                    name: name.clone(),
                });
            }
        }

        ColumnClassification {
            known,
            location_columns,
        }
    }
}

impl Default for ColumnVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_KNOWN_COLUMNS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationColumn {
    /// Position in the header
    pub index: usize,
    pub name: String,
}

/// Result of classifying one run's header. Computed once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnClassification {
    known: Vec<String>,
    location_columns: Vec<LocationColumn>,
}

impl ColumnClassification {
    pub fn known_columns(&self) -> &[String] {
        &self.known
    }

    pub fn location_columns(&self) -> &[LocationColumn] {
        &self.location_columns
    }

    pub fn location_column_names(&self) -> Vec<&str> {
        self.location_columns.iter().map(|c| c.name.as_str()).collect()
    }
}
