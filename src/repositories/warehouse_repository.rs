use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::entities::{
    item::{self, Entity as Item},
    item_warehouse::{self, Entity as ItemWarehouse},
    warehouse::{self, Entity as Warehouse, Model as WarehouseModel},
};
use crate::errors::AppError;
use crate::repositories::{LinkOutcome, Repository, WarehouseStore};

use super::BaseRepository;

#[derive(Debug, Clone)]
pub struct WarehouseRepository {
    base: BaseRepository,
}

impl WarehouseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn create(&self, company_id: Uuid, name: &str) -> Result<WarehouseModel, AppError> {
        AppError::require_id("companyID", company_id)?;
        if name.trim().is_empty() {
            return Err(AppError::ValidationError("warehouse name is required".to_string()));
        }
        let now = Utc::now();
        warehouse::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            name: Set(name.trim().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.base.get_db())
        .await
        .map_err(AppError::DatabaseError)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<WarehouseModel>, AppError> {
        Warehouse::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn unlink_item(&self, warehouse_id: Uuid, item_id: Uuid) -> Result<(), AppError> {
        AppError::require_id("warehouseID", warehouse_id)?;
        AppError::require_id("itemID", item_id)?;
        ItemWarehouse::delete_by_id((item_id, warehouse_id))
            .exec(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(())
    }

    /// Items stocked in a warehouse
    pub async fn list_items(&self, warehouse_id: Uuid) -> Result<Vec<item::Model>, AppError> {
        let ids: Vec<Uuid> = ItemWarehouse::find()
            .select_only()
            .column(item_warehouse::Column::ItemId)
            .filter(item_warehouse::Column::WarehouseId.eq(warehouse_id))
            .into_tuple()
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)?;

        Item::find()
            .filter(item::Column::Id.is_in(ids))
            .order_by_asc(item::Column::Name)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }
}

#[async_trait]
impl WarehouseStore for WarehouseRepository {
    async fn link_item(&self, warehouse_id: Uuid, item_id: Uuid) -> Result<LinkOutcome, AppError> {
        AppError::require_id("warehouseID", warehouse_id)?;
        AppError::require_id("itemID", item_id)?;
        let db = self.base.get_db();

        if ItemWarehouse::find_by_id((item_id, warehouse_id))
            .one(db)
            .await?
            .is_some()
        {
            return Ok(LinkOutcome::AlreadyLinked);
        }

        ItemWarehouse::insert(item_warehouse::ActiveModel {
            item_id: Set(item_id),
            warehouse_id: Set(warehouse_id),
        })
        .exec_without_returning(db)
        .await
        .map_err(AppError::DatabaseError)?;

        debug!(%warehouse_id, %item_id, "linked warehouse to item");
        Ok(LinkOutcome::Created)
    }
}
