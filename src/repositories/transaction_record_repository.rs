use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::entities::transaction_record::{
    self, Column, Entity as TransactionRecord, Model as TransactionRecordModel,
};
use crate::errors::AppError;
use crate::repositories::{NewTransactionRecord, Repository, TransactionRecordStore};

use super::BaseRepository;

#[derive(Debug, Clone)]
pub struct TransactionRecordRepository {
    base: BaseRepository,
}

impl TransactionRecordRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TransactionRecordModel>, AppError> {
        TransactionRecord::find_by_id(id)
            .one(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    /// Records of a file in insertion order
    pub async fn list_by_transaction_file(
        &self,
        transaction_file_id: Uuid,
    ) -> Result<Vec<TransactionRecordModel>, AppError> {
        TransactionRecord::find()
            .filter(Column::TransactionFileId.eq(transaction_file_id))
            .order_by_asc(Column::CreatedAt)
            .all(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }

    pub async fn count_by_transaction_file(&self, transaction_file_id: Uuid) -> Result<u64, AppError> {
        TransactionRecord::find()
            .filter(Column::TransactionFileId.eq(transaction_file_id))
            .count(self.base.get_db())
            .await
            .map_err(AppError::DatabaseError)
    }
}

#[async_trait]
impl TransactionRecordStore for TransactionRecordRepository {
    async fn create(
        &self,
        record: NewTransactionRecord,
    ) -> Result<TransactionRecordModel, AppError> {
        AppError::require_id("companyID", record.company_id)?;
        AppError::require_id("warehouseID", record.warehouse_id)?;
        AppError::require_id("locationID", record.location_id)?;
        AppError::require_id("itemID", record.item_id)?;

        let now = Utc::now();
        let active = transaction_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(record.company_id),
            warehouse_id: Set(record.warehouse_id),
            location_id: Set(record.location_id),
            transaction_file_id: Set(Some(record.transaction_file_id).filter(|id| !id.is_nil())),
            item_id: Set(record.item_id),
            transaction_type: Set(record.transaction_type),
            order_name: Set(record.order_name),
            description: Set(record.description),
            transaction_quantity: Set(record.transaction_quantity),
            completed_quantity: Set(record.completed_quantity),
            completed_date: Set(record.completed_date),
            created_at: Set(now),
            updated_at: Set(now),
        };

        active.insert(self.base.get_db()).await.map_err(|e| {
            error!("Failed to create transaction record: {}", e);
            AppError::DatabaseError(e)
        })
    }
}
