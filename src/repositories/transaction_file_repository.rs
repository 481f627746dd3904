use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::entities::{
    item_transaction_file::{self, Entity as ItemTransactionFile},
    transaction_file::{
        self, ActiveModel as TransactionFileActiveModel, Column, Entity as TransactionFile,
        Model as TransactionFileModel,
    },
    transaction_file_location::{self, Entity as TransactionFileLocation},
};
use crate::errors::AppError;
use crate::repositories::{LinkOutcome, Repository, TransactionFileStore};

use super::BaseRepository;

/// Input for registering an uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransactionFile {
    pub company_id: Uuid,
    pub warehouse_id: Uuid,
    pub file_name: String,
    pub file_path_url: String,
}

impl NewTransactionFile {
    /// Lower-cased extension including the leading dot, or empty
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct TransactionFileRepository {
    base: BaseRepository,
}

impl TransactionFileRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    #[instrument(skip(self), fields(file_name = %input.file_name))]
    pub async fn create(&self, input: NewTransactionFile) -> Result<TransactionFileModel, AppError> {
        if input.file_name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "transaction file name is required".to_string(),
            ));
        }
        AppError::require_id("companyID", input.company_id)?;
        AppError::require_id("warehouseID", input.warehouse_id)?;

        let extension = input.extension();
        transaction_file::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(input.company_id),
            warehouse_id: Set(input.warehouse_id),
            file_name: Set(input.file_name),
            file_extension: Set(extension),
            file_path_url: Set(input.file_path_url),
            created_at: Set(Utc::now()),
        }
        .insert(self.base.get_db())
        .await
        .map_err(|e| {
            error!("Failed to create transaction file: {}", e);
            AppError::DatabaseError(e)
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TransactionFileModel>, AppError> {
        TransactionFile::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    async fn update_with<F>(&self, id: Uuid, apply: F) -> Result<TransactionFileModel, AppError>
    where
        F: FnOnce(&mut TransactionFileActiveModel),
    {
        AppError::require_id("transactionFileID", id)?;
        let existing = self.find_by_id(id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Transaction file with ID {} not found", id))
        })?;
        let mut active: TransactionFileActiveModel = existing.into();
        apply(&mut active);
        active.update(self.base.get_db()).await.map_err(AppError::DatabaseError)
    }

    pub async fn update_name(&self, id: Uuid, name: &str) -> Result<TransactionFileModel, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::InvalidInput("name cannot be empty".to_string()));
        }
        let name = name.to_string();
        self.update_with(id, |m| m.file_name = Set(name)).await
    }

    pub async fn update_extension(
        &self,
        id: Uuid,
        extension: &str,
    ) -> Result<TransactionFileModel, AppError> {
        let extension = extension.to_string();
        self.update_with(id, |m| m.file_extension = Set(extension)).await
    }

    pub async fn update_path_url(
        &self,
        id: Uuid,
        path_url: &str,
    ) -> Result<TransactionFileModel, AppError> {
        let path_url = path_url.to_string();
        self.update_with(id, |m| m.file_path_url = Set(path_url)).await
    }

    /// Delete a file; link rows cascade and its records keep a null file reference
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = TransactionFile::delete_by_id(id)
            .exec(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "Transaction file with ID {} not found",
                id
            )));
        }
        Ok(())
    }

    pub async fn unlink_location(
        &self,
        transaction_file_id: Uuid,
        location_id: Uuid,
    ) -> Result<(), AppError> {
        TransactionFileLocation::delete_by_id((transaction_file_id, location_id))
            .exec(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(())
    }

    pub async fn unlink_item(&self, transaction_file_id: Uuid, item_id: Uuid) -> Result<(), AppError> {
        ItemTransactionFile::delete_by_id((item_id, transaction_file_id))
            .exec(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(())
    }

    /// Files uploaded for a warehouse, newest first
    pub async fn list_by_warehouse(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<TransactionFileModel>, AppError> {
        TransactionFile::find()
            .filter(Column::WarehouseId.eq(warehouse_id))
            .order_by_desc(Column::CreatedAt)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn count_locations(&self, transaction_file_id: Uuid) -> Result<u64, AppError> {
        TransactionFileLocation::find()
            .filter(transaction_file_location::Column::TransactionFileId.eq(transaction_file_id))
            .count(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn count_items(&self, transaction_file_id: Uuid) -> Result<u64, AppError> {
        ItemTransactionFile::find()
            .filter(item_transaction_file::Column::TransactionFileId.eq(transaction_file_id))
            .count(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }
}

#[async_trait]
impl TransactionFileStore for TransactionFileRepository {
    async fn link_location(
        &self,
        transaction_file_id: Uuid,
        location_id: Uuid,
    ) -> Result<LinkOutcome, AppError> {
        AppError::require_id("transactionFileID", transaction_file_id)?;
        AppError::require_id("locationID", location_id)?;
        let db = self.base.get_db();

        if TransactionFileLocation::find_by_id((transaction_file_id, location_id))
            .one(db)
            .await?
            .is_some()
        {
            return Ok(LinkOutcome::AlreadyLinked);
        }

        TransactionFileLocation::insert(transaction_file_location::ActiveModel {
            transaction_file_id: Set(transaction_file_id),
            location_id: Set(location_id),
        })
        .exec_without_returning(db)
        .await
        .map_err(AppError::DatabaseError)?;

        debug!(%transaction_file_id, %location_id, "linked transaction file to location");
        Ok(LinkOutcome::Created)
    }

    async fn link_item(
        &self,
        transaction_file_id: Uuid,
        item_id: Uuid,
    ) -> Result<LinkOutcome, AppError> {
        AppError::require_id("transactionFileID", transaction_file_id)?;
        AppError::require_id("itemID", item_id)?;
        let db = self.base.get_db();

        if ItemTransactionFile::find_by_id((item_id, transaction_file_id))
            .one(db)
            .await?
            .is_some()
        {
            return Ok(LinkOutcome::AlreadyLinked);
        }

        ItemTransactionFile::insert(item_transaction_file::ActiveModel {
            item_id: Set(item_id),
            transaction_file_id: Set(transaction_file_id),
        })
        .exec_without_returning(db)
        .await
        .map_err(AppError::DatabaseError)?;

        debug!(%transaction_file_id, %item_id, "linked transaction file to item");
        Ok(LinkOutcome::Created)
    }
}
