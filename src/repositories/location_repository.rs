use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::entities::{
    item,
    item_location::{self, Entity as ItemLocation},
    location::{self, ActiveModel as LocationActiveModel, Column, Entity as Location, Model as LocationModel},
    transaction_file_location::{self, Entity as TransactionFileLocation},
};
use crate::errors::AppError;
use crate::repositories::{LinkOutcome, LocationStore, NewLocation, Repository};

use super::BaseRepository;

/// Repository for warehouse locations
#[derive(Debug, Clone)]
pub struct LocationRepository {
    base: BaseRepository,
}

impl LocationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find a location by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<LocationModel>, AppError> {
        Location::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    async fn require(&self, id: Uuid) -> Result<LocationModel, AppError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Location with ID {} not found", id)))
    }

    /// Replace the slash-joined path of a location
    pub async fn update_path(&self, id: Uuid, new_path: &str) -> Result<LocationModel, AppError> {
        if new_path.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "invalid input to update location path".to_string(),
            ));
        }
        let mut active: LocationActiveModel = self.require(id).await?.into();
        active.location_path = Set(new_path.to_string());
        active.updated_at = Set(Utc::now());
        active.update(self.base.get_db()).await.map_err(AppError::DatabaseError)
    }

    /// Replace the display name path of a location
    pub async fn update_name_path(
        &self,
        id: Uuid,
        new_name_path: &str,
    ) -> Result<LocationModel, AppError> {
        if new_name_path.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "invalid input to update location name path".to_string(),
            ));
        }
        let mut active: LocationActiveModel = self.require(id).await?.into();
        active.location_name_path = Set(new_name_path.to_string());
        active.updated_at = Set(Utc::now());
        active.update(self.base.get_db()).await.map_err(AppError::DatabaseError)
    }

    /// Delete a location
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = Location::delete_by_id(id)
            .exec(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Location with ID {} not found", id)));
        }
        Ok(())
    }

    /// Remove the location<->item association if present
    pub async fn unlink_item(&self, location_id: Uuid, item_id: Uuid) -> Result<(), AppError> {
        AppError::require_id("LocationID", location_id)?;
        AppError::require_id("ItemID", item_id)?;
        ItemLocation::delete_by_id((item_id, location_id))
            .exec(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(())
    }

    /// All locations of a warehouse ordered by path
    pub async fn list_by_warehouse(&self, warehouse_id: Uuid) -> Result<Vec<LocationModel>, AppError> {
        Location::find()
            .filter(Column::WarehouseId.eq(warehouse_id))
            .order_by_asc(Column::LocationPath)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn count_by_warehouse(&self, warehouse_id: Uuid) -> Result<u64, AppError> {
        Location::find()
            .filter(Column::WarehouseId.eq(warehouse_id))
            .count(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Locations linked to a transaction file
    pub async fn list_by_transaction_file(
        &self,
        transaction_file_id: Uuid,
    ) -> Result<Vec<LocationModel>, AppError> {
        let ids: Vec<Uuid> = TransactionFileLocation::find()
            .select_only()
            .column(transaction_file_location::Column::LocationId)
            .filter(transaction_file_location::Column::TransactionFileId.eq(transaction_file_id))
            .into_tuple()
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)?;

        Location::find()
            .filter(Column::Id.is_in(ids))
            .order_by_asc(Column::LocationPath)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }
}

#[async_trait]
impl LocationStore for LocationRepository {
    async fn get_by_path(
        &self,
        warehouse_id: Uuid,
        location_path: &str,
    ) -> Result<Option<LocationModel>, AppError> {
        Location::find()
            .filter(Column::WarehouseId.eq(warehouse_id))
            .filter(Column::LocationPath.eq(location_path))
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    async fn create(&self, new_location: NewLocation) -> Result<LocationModel, AppError> {
        if new_location.warehouse_id.is_nil() {
            return Err(AppError::ValidationError(
                "location must have a warehouseID".to_string(),
            ));
        }
        if new_location.location_path.is_empty() {
            return Err(AppError::ValidationError(
                "location path is required".to_string(),
            ));
        }

        let now = Utc::now();
        let active = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(new_location.warehouse_id),
            location_path: Set(new_location.location_path),
            location_name_path: Set(new_location.location_name_path),
            created_at: Set(now),
            updated_at: Set(now),
        };

        active.insert(self.base.get_db()).await.map_err(|e| {
            error!("Failed to create location: {}", e);
            AppError::DatabaseError(e)
        })
    }

    async fn link_item(&self, location_id: Uuid, item_id: Uuid) -> Result<LinkOutcome, AppError> {
        AppError::require_id("LocationID", location_id)?;
        AppError::require_id("ItemID", item_id)?;
        let db = self.base.get_db();

        self.require(location_id).await?;
        item::Entity::find_by_id(item_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with ID {} not found", item_id)))?;

        let existing = ItemLocation::find_by_id((item_id, location_id))
            .one(db)
            .await
            .map_err(AppError::DatabaseError)?;
        if existing.is_some() {
            return Ok(LinkOutcome::AlreadyLinked);
        }

        ItemLocation::insert(item_location::ActiveModel {
            item_id: Set(item_id),
            location_id: Set(location_id),
        })
        .exec_without_returning(db)
        .await
        .map_err(AppError::DatabaseError)?;

        debug!(%location_id, %item_id, "linked location to item");
        Ok(LinkOutcome::Created)
    }
}
