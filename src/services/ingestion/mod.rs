//! Transaction-file ingestion.
//!
//! One run reads an uploaded file row by row, resolves each distinct
//! location path and item name against the stores the first time it is
//! seen, links locations to items, writes one transaction record per
//! resolvable row and finally links the file to everything it touched.
//!
//! Writes are sequential and not wrapped in a transaction. A store error
//! stops the run; whatever was written before it stays, and the failure
//! carries the number of records already created.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::errors::{IngestError, IngestFailure};
use crate::events::{Event, EventSender};
use crate::parsing::open_source;
use crate::repositories::IngestionStores;

pub mod cache;
pub mod classifier;
pub mod extractor;
pub mod linker;
pub mod resolver;

#[cfg(test)]
pub(crate) mod mocks;

pub use cache::{BatchEntityCache, Resolution};
pub use classifier::{ColumnClassification, ColumnVocabulary, LocationColumn};
pub use extractor::{RowExtractor, TransactionDraft};
pub use linker::AssociationLinker;
pub use resolver::{EntityResolver, Resolved};

/// Identifiers an ingestion run attributes its output to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestTarget {
    pub transaction_file_id: Uuid,
    pub company_id: Uuid,
    pub warehouse_id: Uuid,
}

impl IngestTarget {
    fn validate(&self) -> Result<(), IngestError> {
        for (name, id) in [
            ("transaction file id", self.transaction_file_id),
            ("company id", self.company_id),
            ("warehouse id", self.warehouse_id),
        ] {
            if id.is_nil() {
                return Err(IngestError::InvalidTarget(format!("{} must not be nil", name)));
            }
        }
        Ok(())
    }
}

/// Counters for a successful run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub records_created: usize,
    pub rows_read: usize,
    /// Rows that did not fit the header, plus blank rows
    pub rows_skipped: usize,
    /// Rows whose location or item key could not name an entity
    pub rows_unresolved: usize,
    pub locations_created: usize,
    pub locations_reused: usize,
    pub items_created: usize,
    pub items_reused: usize,
    pub location_item_links_created: usize,
    pub file_links_created: usize,
}

impl IngestReport {
    fn absorb(&mut self, summary: resolver::ResolutionSummary) {
        self.locations_created += summary.locations_created;
        self.locations_reused += summary.locations_reused;
        self.items_created += summary.items_created;
        self.items_reused += summary.items_reused;
    }
}

#[derive(Clone)]
pub struct IngestionService {
    stores: IngestionStores,
    vocabulary: Arc<ColumnVocabulary>,
    extractor: RowExtractor,
    max_file_bytes: usize,
    event_sender: Option<EventSender>,
}

impl IngestionService {
    pub fn new(stores: IngestionStores, config: &IngestConfig) -> Self {
        Self {
            stores,
            vocabulary: Arc::new(with_extracted_columns(ColumnVocabulary::from_config(config))),
            extractor: RowExtractor::new(config.completed_date_format.clone()),
            max_file_bytes: config.max_file_bytes,
            event_sender: None,
        }
    }

    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    /// Replaces the column vocabulary used to classify headers.
    ///
    /// The columns the extractor reads by name stay known even when
    /// `vocabulary` leaves them out.
    pub fn with_vocabulary(mut self, vocabulary: ColumnVocabulary) -> Self {
        self.vocabulary = Arc::new(with_extracted_columns(vocabulary));
        self
    }

    /// Ingests `bytes`, choosing the reader from `file_name`'s extension.
    pub async fn ingest(
        &self,
        bytes: &[u8],
        file_name: &str,
        target: IngestTarget,
    ) -> Result<IngestReport, IngestFailure> {
        self.ingest_with_cancellation(bytes, file_name, target, &CancellationToken::new())
            .await
    }

    /// Like [`ingest`](Self::ingest), checking `cancel` between rows and
    /// before the file links are written.
    #[instrument(
        skip(self, bytes, cancel),
        fields(
            transaction_file_id = %target.transaction_file_id,
            warehouse_id = %target.warehouse_id,
            size = bytes.len()
        )
    )]
    pub async fn ingest_with_cancellation(
        &self,
        bytes: &[u8],
        file_name: &str,
        target: IngestTarget,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, IngestFailure> {
        let started = Instant::now();
        let result = self.run(bytes, file_name, &target, cancel).await;
        histogram!("slotter_ingest.run.duration", started.elapsed());

        match &result {
            Ok(report) => {
                counter!("slotter_ingest.records_created", report.records_created as u64);
                counter!("slotter_ingest.rows_skipped", report.rows_skipped as u64);
                counter!("slotter_ingest.locations_created", report.locations_created as u64);
                counter!("slotter_ingest.items_created", report.items_created as u64);
                info!(
                    records_created = report.records_created,
                    rows_read = report.rows_read,
                    rows_skipped = report.rows_skipped,
                    rows_unresolved = report.rows_unresolved,
                    "transaction file ingested"
                );
                self.notify(Event::TransactionFileIngested {
                    transaction_file_id: target.transaction_file_id,
                    company_id: target.company_id,
                    warehouse_id: target.warehouse_id,
                    records_created: report.records_created as u64,
                })
                .await;
            }
            Err(failure) => {
                counter!("slotter_ingest.runs_failed", 1);
                counter!("slotter_ingest.records_created", failure.records_created as u64);
                error!(
                    records_created = failure.records_created,
                    error = %failure.error,
                    "transaction file ingestion failed"
                );
                self.notify(Event::TransactionFileIngestFailed {
                    transaction_file_id: target.transaction_file_id,
                    company_id: target.company_id,
                    records_created: failure.records_created as u64,
                    reason: failure.error.to_string(),
                })
                .await;
            }
        }

        result
    }

    async fn notify(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event).await;
        }
    }

    async fn run(
        &self,
        bytes: &[u8],
        file_name: &str,
        target: &IngestTarget,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, IngestFailure> {
        target.validate().map_err(IngestFailure::before_start)?;
        if bytes.len() > self.max_file_bytes {
            return Err(IngestFailure::before_start(IngestError::FileTooLarge {
                size: bytes.len(),
                limit: self.max_file_bytes,
            }));
        }

        let mut source = open_source(bytes, file_name).map_err(IngestFailure::before_start)?;
        let columns = self.vocabulary.classify(source.header());
        debug!(
            location_columns = ?columns.location_column_names(),
            "classified header"
        );

        let mut cache = BatchEntityCache::new();
        let resolver = EntityResolver::new(
            self.stores.clone(),
            target.company_id,
            target.warehouse_id,
        );
        let mut linker = AssociationLinker::new(self.stores.clone(), target.transaction_file_id);
        let mut report = IngestReport::default();

        loop {
            if cancel.is_cancelled() {
                return Err(IngestFailure::new(report.records_created, IngestError::Cancelled));
            }

            let row = match source.next_row() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => return Err(IngestFailure::new(report.records_created, e)),
            };
            report.rows_read += 1;

            let Some(draft) = self.extractor.extract(&row, &columns) else {
                report.rows_skipped += 1;
                continue;
            };

            cache.insert_location(&draft.location_key, &draft.location_name_path);
            cache.insert_item(&draft.item_key);
            let summary = resolver
                .resolve_pending(&mut cache)
                .await
                .map_err(|e| IngestFailure::new(report.records_created, e))?;
            report.absorb(summary);

            let (Some(location_id), Some(item_id)) = (
                cache.location_id(&draft.location_key),
                cache.item_id(&draft.item_key),
            ) else {
                debug!(
                    row = draft.row,
                    location = %draft.location_key,
                    item = %draft.item_key,
                    "row has no usable location or item"
                );
                report.rows_unresolved += 1;
                continue;
            };

            if linker
                .link_location_item(location_id, item_id)
                .await
                .map_err(|e| IngestFailure::new(report.records_created, e))?
                .is_created()
            {
                report.location_item_links_created += 1;
            }

            self.stores
                .records
                .create(draft.into_record(target, location_id, item_id))
                .await
                .map_err(|e| {
                    IngestFailure::new(report.records_created, IngestError::RecordCreation(e))
                })?;
            report.records_created += 1;
        }
        report.rows_skipped += source.skipped_rows();

        if cancel.is_cancelled() {
            return Err(IngestFailure::new(report.records_created, IngestError::Cancelled));
        }

        let file_links = linker
            .link_file_to_batch(&cache)
            .await
            .map_err(|e| IngestFailure::new(report.records_created, e))?;
        report.file_links_created = file_links.created;

        Ok(report)
    }
}

fn with_extracted_columns(vocabulary: ColumnVocabulary) -> ColumnVocabulary {
    vocabulary.including(extractor::EXTRACTED_COLUMNS)
}
