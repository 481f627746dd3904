use sea_orm::error::DbErr;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Errors raised by the persistent-store layer.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Rejects the nil UUID for a named identifier.
    pub fn require_id(name: &str, id: Uuid) -> Result<(), ServiceError> {
        if id.is_nil() {
            return Err(ServiceError::InvalidInput(format!("invalid {}", name)));
        }
        Ok(())
    }
}

/// Entity kinds the pipeline resolves against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Location,
    Item,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Location => f.write_str("location"),
            EntityKind::Item => f.write_str("item"),
        }
    }
}

/// Association tables written by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    LocationItem,
    WarehouseItem,
    FileLocation,
    FileItem,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkKind::LocationItem => "location<->item",
            LinkKind::WarehouseItem => "warehouse<->item",
            LinkKind::FileLocation => "file<->location",
            LinkKind::FileItem => "file<->item",
        };
        f.write_str(name)
    }
}

/// Fatal ingestion errors.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("unsupported file extension: {0}")]
    UnsupportedFormat(String),

    #[error("{0} parsing not implemented")]
    NotImplemented(String),

    #[error("unreadable source: {0}")]
    Source(String),

    #[error("invalid ingestion target: {0}")]
    InvalidTarget(String),

    #[error("file is {size} bytes, limit is {limit}")]
    FileTooLarge { size: usize, limit: usize },

    #[error("failed to resolve {kind} '{key}': {source}")]
    EntityResolution {
        kind: EntityKind,
        key: String,
        #[source]
        source: ServiceError,
    },

    #[error("failed to create {kind} link: {source}")]
    Link {
        kind: LinkKind,
        #[source]
        source: ServiceError,
    },

    #[error("failed to create transaction record: {0}")]
    RecordCreation(#[source] ServiceError),

    #[error("ingestion cancelled")]
    Cancelled,
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        IngestError::Source(format!("csv read error: {}", err))
    }
}

impl From<calamine::XlsxError> for IngestError {
    fn from(err: calamine::XlsxError) -> Self {
        IngestError::Source(format!("cannot open XLSX: {}", err))
    }
}

/// Row-level data-quality problems. Recovered locally, never returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIssue {
    MalformedRow { expected: usize, found: usize },
    UnparseableValue { column: &'static str, value: String },
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowIssue::MalformedRow { expected, found } => {
                write!(f, "expected {} fields, found {}", expected, found)
            }
            RowIssue::UnparseableValue { column, value } => {
                write!(f, "unparseable {} value '{}'", column, value)
            }
        }
    }
}

/// A failed run: the first fatal error plus the records created before it.
#[derive(Debug, thiserror::Error)]
#[error("{error} ({records_created} transaction records created before failure)")]
pub struct IngestFailure {
    pub records_created: usize,
    #[source]
    pub error: IngestError,
}

impl IngestFailure {
    pub fn new(records_created: usize, error: IngestError) -> Self {
        Self {
            records_created,
            error,
        }
    }

    /// Failure raised before any row was read.
    pub fn before_start(error: IngestError) -> Self {
        Self::new(0, error)
    }
}

// Type aliases for backwards compatibility
pub type AppError = ServiceError;
