use tracing::{debug, instrument};
use uuid::Uuid;

use super::cache::{BatchEntityCache, Resolution};
use crate::errors::{EntityKind, IngestError, LinkKind};
use crate::repositories::{IngestionStores, NewItem, NewLocation};

/// How a key was turned into an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Existing(Uuid),
    Created(Uuid),
}

impl Resolved {
    pub fn id(self) -> Uuid {
        match self {
            Resolved::Existing(id) | Resolved::Created(id) => id,
        }
    }

    pub fn was_created(self) -> bool {
        matches!(self, Resolved::Created(_))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionSummary {
    pub locations_created: usize,
    pub locations_reused: usize,
    pub items_created: usize,
    pub items_reused: usize,
    pub unresolvable: usize,
}

/// Get-or-create of locations (by warehouse and path) and items (by company and name).
pub struct EntityResolver {
    stores: IngestionStores,
    company_id: Uuid,
    warehouse_id: Uuid,
}

impl EntityResolver {
    pub fn new(stores: IngestionStores, company_id: Uuid, warehouse_id: Uuid) -> Self {
        Self {
            stores,
            company_id,
            warehouse_id,
        }
    }

    #[instrument(skip(self, name_path))]
    pub async fn resolve_location(
        &self,
        location_path: &str,
        name_path: &str,
    ) -> Result<Resolved, IngestError> {
        let fail = |source| IngestError::EntityResolution {
            kind: EntityKind::Location,
            key: location_path.to_string(),
            source,
        };

        if let Some(existing) = self
            .stores
            .locations
            .get_by_path(self.warehouse_id, location_path)
            .await
            .map_err(fail)?
        {
            return Ok(Resolved::Existing(existing.id));
        }

        let created = self
            .stores
            .locations
            .create(NewLocation {
                warehouse_id: self.warehouse_id,
                location_path: location_path.to_string(),
                location_name_path: name_path.to_string(),
            })
            .await
            .map_err(fail)?;
        debug!(location_id = %created.id, "created location");
        Ok(Resolved::Created(created.id))
    }

    /// A newly created item is also linked to the warehouse.
    #[instrument(skip(self))]
    pub async fn resolve_item(&self, name: &str) -> Result<Resolved, IngestError> {
        let fail = |source| IngestError::EntityResolution {
            kind: EntityKind::Item,
            key: name.to_string(),
            source,
        };

        if let Some(existing) = self
            .stores
            .items
            .get_by_name(self.company_id, name)
            .await
            .map_err(fail)?
        {
            return Ok(Resolved::Existing(existing.id));
        }

        let created = self
            .stores
            .items
            .create(NewItem {
                company_id: self.company_id,
                name: name.to_string(),
            })
            .await
            .map_err(fail)?;
        debug!(item_id = %created.id, "created item");

        self.stores
            .warehouses
            .link_item(self.warehouse_id, created.id)
            .await
            .map_err(|source| IngestError::Link {
                kind: LinkKind::WarehouseItem,
                source,
            })?;

        Ok(Resolved::Created(created.id))
    }

    /// Resolves every pending cache entry, locations first.
    ///
    /// Empty keys never reach the store; they are settled as unresolvable.
    pub async fn resolve_pending(
        &self,
        cache: &mut BatchEntityCache,
    ) -> Result<ResolutionSummary, IngestError> {
        let mut summary = ResolutionSummary::default();

        for (path, name_path) in cache.take_pending_locations() {
            if path.is_empty() {
                cache.settle_location(&path, Resolution::Unresolvable);
                summary.unresolvable += 1;
                continue;
            }
            let resolved = self.resolve_location(&path, &name_path).await?;
            if resolved.was_created() {
                summary.locations_created += 1;
            } else {
                summary.locations_reused += 1;
            }
            cache.settle_location(&path, Resolution::Resolved(resolved.id()));
        }

        for name in cache.take_pending_items() {
            if name.is_empty() {
                cache.settle_item(&name, Resolution::Unresolvable);
                summary.unresolvable += 1;
                continue;
            }
            let resolved = self.resolve_item(&name).await?;
            if resolved.was_created() {
                summary.items_created += 1;
            } else {
                summary.items_reused += 1;
            }
            cache.settle_item(&name, Resolution::Resolved(resolved.id()));
        }

        Ok(summary)
    }
}
