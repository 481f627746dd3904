// Transaction file ingestion pipeline
pub mod ingestion;
