use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::entities::{
    item::{self, ActiveModel as ItemActiveModel, Column, Entity as Item, Model as ItemModel},
    item_location::{self, Entity as ItemLocation},
};
use crate::errors::AppError;
use crate::repositories::{ItemStore, NewItem, Repository};

use super::BaseRepository;

/// Repository for company-scoped items
#[derive(Debug, Clone)]
pub struct ItemRepository {
    base: BaseRepository,
}

impl ItemRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find an item by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ItemModel>, AppError> {
        Item::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Rename an item
    pub async fn update_name(&self, id: Uuid, new_name: &str) -> Result<ItemModel, AppError> {
        AppError::require_id("itemID", id)?;
        if new_name.is_empty() {
            return Err(AppError::InvalidInput("new name cannot be empty".to_string()));
        }
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with ID {} not found", id)))?;
        let mut active: ItemActiveModel = existing.into();
        active.name = Set(new_name.to_string());
        active.updated_at = Set(Utc::now());
        active.update(self.base.get_db()).await.map_err(AppError::DatabaseError)
    }

    /// Delete an item
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = Item::delete_by_id(id)
            .exec(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Item with ID {} not found", id)));
        }
        Ok(())
    }

    /// All items of a company ordered by name
    pub async fn list_by_company(&self, company_id: Uuid) -> Result<Vec<ItemModel>, AppError> {
        Item::find()
            .filter(Column::CompanyId.eq(company_id))
            .order_by_asc(Column::Name)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Items linked to a location
    pub async fn list_by_location(&self, location_id: Uuid) -> Result<Vec<ItemModel>, AppError> {
        let ids: Vec<Uuid> = ItemLocation::find()
            .select_only()
            .column(item_location::Column::ItemId)
            .filter(item_location::Column::LocationId.eq(location_id))
            .into_tuple()
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)?;

        Item::find()
            .filter(Column::Id.is_in(ids))
            .order_by_asc(Column::Name)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }
}

#[async_trait]
impl ItemStore for ItemRepository {
    async fn get_by_name(&self, company_id: Uuid, name: &str) -> Result<Option<ItemModel>, AppError> {
        Item::find()
            .filter(Column::CompanyId.eq(company_id))
            .filter(Column::Name.eq(name))
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    async fn create(&self, new_item: NewItem) -> Result<ItemModel, AppError> {
        if new_item.name.is_empty() {
            return Err(AppError::ValidationError("item name is required".to_string()));
        }
        AppError::require_id("companyID", new_item.company_id)?;

        let now = Utc::now();
        let active = item::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(new_item.company_id),
            name: Set(new_item.name),
            created_at: Set(now),
            updated_at: Set(now),
        };

        active.insert(self.base.get_db()).await.map_err(|e| {
            error!("Failed to create item: {}", e);
            AppError::DatabaseError(e)
        })
    }
}
