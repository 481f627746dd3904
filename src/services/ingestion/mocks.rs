//! mockall doubles of the store traits for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mockall::mock;
use uuid::Uuid;

use crate::entities::{item, location, transaction_record};
use crate::errors::ServiceError;
use crate::repositories::{
    IngestionStores, ItemStore, LinkOutcome, LocationStore, NewItem, NewLocation,
    NewTransactionRecord, TransactionFileStore, TransactionRecordStore, WarehouseStore,
};

mock! {
    pub Locations {}

    #[async_trait]
    impl LocationStore for Locations {
        async fn get_by_path(
            &self,
            warehouse_id: Uuid,
            location_path: &str,
        ) -> Result<Option<location::Model>, ServiceError>;
        async fn create(&self, location: NewLocation) -> Result<location::Model, ServiceError>;
        async fn link_item(&self, location_id: Uuid, item_id: Uuid) -> Result<LinkOutcome, ServiceError>;
    }
}

mock! {
    pub Items {}

    #[async_trait]
    impl ItemStore for Items {
        async fn get_by_name(&self, company_id: Uuid, name: &str) -> Result<Option<item::Model>, ServiceError>;
        async fn create(&self, item: NewItem) -> Result<item::Model, ServiceError>;
    }
}

mock! {
    pub Warehouses {}

    #[async_trait]
    impl WarehouseStore for Warehouses {
        async fn link_item(&self, warehouse_id: Uuid, item_id: Uuid) -> Result<LinkOutcome, ServiceError>;
    }
}

mock! {
    pub Records {}

    #[async_trait]
    impl TransactionRecordStore for Records {
        async fn create(&self, record: NewTransactionRecord) -> Result<transaction_record::Model, ServiceError>;
    }
}

mock! {
    pub Files {}

    #[async_trait]
    impl TransactionFileStore for Files {
        async fn link_location(&self, transaction_file_id: Uuid, location_id: Uuid) -> Result<LinkOutcome, ServiceError>;
        async fn link_item(&self, transaction_file_id: Uuid, item_id: Uuid) -> Result<LinkOutcome, ServiceError>;
    }
}

pub(crate) fn location_model(warehouse_id: Uuid, path: &str) -> location::Model {
    location::Model {
        id: Uuid::new_v4(),
        warehouse_id,
        location_path: path.to_string(),
        location_name_path: String::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub(crate) fn item_model(company_id: Uuid, name: &str) -> item::Model {
    item::Model {
        id: Uuid::new_v4(),
        company_id,
        name: name.to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub(crate) fn stores(locations: MockLocations, items: MockItems, warehouses: MockWarehouses) -> IngestionStores {
    IngestionStores {
        locations: Arc::new(locations),
        items: Arc::new(items),
        warehouses: Arc::new(warehouses),
        records: Arc::new(MockRecords::new()),
        files: Arc::new(MockFiles::new()),
    }
}

/// Stores for the linker: location links and file links are mocked, the rest never called.
pub(crate) fn link_stores(locations: MockLocations, files: MockFiles) -> IngestionStores {
    IngestionStores {
        locations: Arc::new(locations),
        items: Arc::new(MockItems::new()),
        warehouses: Arc::new(MockWarehouses::new()),
        records: Arc::new(MockRecords::new()),
        files: Arc::new(files),
    }
}
