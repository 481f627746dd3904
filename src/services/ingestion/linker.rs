use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use super::cache::BatchEntityCache;
use crate::errors::{IngestError, LinkKind};
use crate::repositories::{IngestionStores, LinkOutcome};

/// Idempotent creation of the run's association links.
///
/// Location<->item pairs are remembered for the run so the store is asked
/// at most once per distinct pair. The stores check for an existing link
/// before inserting.
pub struct AssociationLinker {
    stores: IngestionStores,
    transaction_file_id: Uuid,
    linked_pairs: HashSet<(Uuid, Uuid)>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileLinkSummary {
    pub locations_linked: usize,
    pub items_linked: usize,
    pub created: usize,
}

impl AssociationLinker {
    pub fn new(stores: IngestionStores, transaction_file_id: Uuid) -> Self {
        Self {
            stores,
            transaction_file_id,
            linked_pairs: HashSet::new(),
        }
    }

    pub async fn link_location_item(
        &mut self,
        location_id: Uuid,
        item_id: Uuid,
    ) -> Result<LinkOutcome, IngestError> {
        if self.linked_pairs.contains(&(location_id, item_id)) {
            return Ok(LinkOutcome::AlreadyLinked);
        }

        let outcome = self
            .stores
            .locations
            .link_item(location_id, item_id)
            .await
            .map_err(|source| IngestError::Link {
                kind: LinkKind::LocationItem,
                source,
            })?;
        self.linked_pairs.insert((location_id, item_id));
        Ok(outcome)
    }

    pub async fn link_file_location(&self, location_id: Uuid) -> Result<LinkOutcome, IngestError> {
        self.stores
            .files
            .link_location(self.transaction_file_id, location_id)
            .await
            .map_err(|source| IngestError::Link {
                kind: LinkKind::FileLocation,
                source,
            })
    }

    pub async fn link_file_item(&self, item_id: Uuid) -> Result<LinkOutcome, IngestError> {
        self.stores
            .files
            .link_item(self.transaction_file_id, item_id)
            .await
            .map_err(|source| IngestError::Link {
                kind: LinkKind::FileItem,
                source,
            })
    }

    /// Links the file to every resolved location, then every resolved item.
    pub async fn link_file_to_batch(
        &self,
        cache: &BatchEntityCache,
    ) -> Result<FileLinkSummary, IngestError> {
        let mut summary = FileLinkSummary::default();

        for location_id in cache.resolved_location_ids() {
            if self.link_file_location(location_id).await?.is_created() {
                summary.created += 1;
            }
            summary.locations_linked += 1;
        }
        for item_id in cache.resolved_item_ids() {
            if self.link_file_item(item_id).await?.is_created() {
                summary.created += 1;
            }
            summary.items_linked += 1;
        }

        debug!(
            transaction_file_id = %self.transaction_file_id,
            locations = summary.locations_linked,
            items = summary.items_linked,
            created = summary.created,
            "linked transaction file"
        );
        Ok(summary)
    }

    pub fn distinct_pairs(&self) -> usize {
        self.linked_pairs.len()
    }
}
