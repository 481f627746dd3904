//! Slotter ingestion library
//!
//! Turns operator-supplied inventory transaction files (CSV or XLSX) into
//! warehouse locations, items, transaction records and the links between them.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod parsing;
pub mod repositories;
pub mod services;

pub use errors::{IngestError, IngestFailure, ServiceError};
pub use services::ingestion::{IngestReport, IngestTarget, IngestionService};

/// Commonly used types for embedding the pipeline
pub mod prelude {
    pub use crate::config::{AppConfig, IngestConfig};
    pub use crate::errors::{IngestError, IngestFailure, ServiceError};
    pub use crate::events::{Event, EventSender};
    pub use crate::repositories::IngestionStores;
    pub use crate::services::ingestion::{
        ColumnVocabulary, IngestReport, IngestTarget, IngestionService,
    };
}
