use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{item, location, transaction_record};
use crate::errors::ServiceError;

pub mod item_repository;
pub mod location_repository;
pub mod transaction_file_repository;
pub mod transaction_record_repository;
pub mod warehouse_repository;

pub use item_repository::ItemRepository;
pub use location_repository::LocationRepository;
pub use transaction_file_repository::{NewTransactionFile, TransactionFileRepository};
pub use transaction_record_repository::TransactionRecordRepository;
pub use warehouse_repository::WarehouseRepository;

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Result of an idempotent link insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOutcome {
    Created,
    AlreadyLinked,
}

impl LinkOutcome {
    pub fn is_created(self) -> bool {
        matches!(self, LinkOutcome::Created)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLocation {
    pub warehouse_id: Uuid,
    pub location_path: String,
    pub location_name_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub company_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransactionRecord {
    pub company_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub transaction_file_id: Uuid,
    pub item_id: Uuid,
    pub transaction_type: String,
    pub order_name: String,
    pub description: String,
    pub transaction_quantity: i32,
    pub completed_quantity: i32,
    pub completed_date: Option<NaiveDate>,
}

/// Warehouse-scoped location lookups and writes used by ingestion.
#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn get_by_path(
        &self,
        warehouse_id: Uuid,
        location_path: &str,
    ) -> Result<Option<location::Model>, ServiceError>;

    async fn create(&self, location: NewLocation) -> Result<location::Model, ServiceError>;

    async fn link_item(&self, location_id: Uuid, item_id: Uuid)
        -> Result<LinkOutcome, ServiceError>;
}

/// Company-scoped item lookups and writes used by ingestion.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get_by_name(
        &self,
        company_id: Uuid,
        name: &str,
    ) -> Result<Option<item::Model>, ServiceError>;

    async fn create(&self, item: NewItem) -> Result<item::Model, ServiceError>;
}

#[async_trait]
pub trait WarehouseStore: Send + Sync {
    async fn link_item(&self, warehouse_id: Uuid, item_id: Uuid)
        -> Result<LinkOutcome, ServiceError>;
}

#[async_trait]
pub trait TransactionRecordStore: Send + Sync {
    async fn create(
        &self,
        record: NewTransactionRecord,
    ) -> Result<transaction_record::Model, ServiceError>;
}

#[async_trait]
pub trait TransactionFileStore: Send + Sync {
    async fn link_location(
        &self,
        transaction_file_id: Uuid,
        location_id: Uuid,
    ) -> Result<LinkOutcome, ServiceError>;

    async fn link_item(
        &self,
        transaction_file_id: Uuid,
        item_id: Uuid,
    ) -> Result<LinkOutcome, ServiceError>;
}

/// The collaborator set one ingestion run talks to.
#[derive(Clone)]
pub struct IngestionStores {
    pub locations: Arc<dyn LocationStore>,
    pub items: Arc<dyn ItemStore>,
    pub warehouses: Arc<dyn WarehouseStore>,
    pub records: Arc<dyn TransactionRecordStore>,
    pub files: Arc<dyn TransactionFileStore>,
}

impl IngestionStores {
    /// sea-orm backed stores sharing one connection pool.
    pub fn from_db(db: Arc<DatabaseConnection>) -> Self {
        Self {
            locations: Arc::new(LocationRepository::new(db.clone())),
            items: Arc::new(ItemRepository::new(db.clone())),
            warehouses: Arc::new(WarehouseRepository::new(db.clone())),
            records: Arc::new(TransactionRecordRepository::new(db.clone())),
            files: Arc::new(TransactionFileRepository::new(db)),
        }
    }
}
