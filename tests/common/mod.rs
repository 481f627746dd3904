#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ConnectionTrait;
use slotter_ingest::{
    config::{AppConfig, IngestConfig},
    db::{self, DbPool},
    entities::{item, location, transaction_record},
    errors::ServiceError,
    repositories::{
        IngestionStores, ItemStore, LinkOutcome, LocationStore, NewItem, NewLocation,
        NewTransactionRecord, TransactionFileStore, TransactionRecordStore, WarehouseStore,
    },
    services::ingestion::{IngestTarget, IngestionService},
};
use uuid::Uuid;

/// Header used by most pipeline tests: the fixed columns plus two location columns.
pub const HEADER: &str = "Transaction Type,Order Number,Description,Item Number,Transaction Quantity,Completed Quantity,Completed Date,Zone,Aisle";

/// Builds a CSV document from `HEADER` and the given data lines.
pub fn csv(lines: &[&str]) -> Vec<u8> {
    let mut doc = String::from(HEADER);
    for line in lines {
        doc.push('\n');
        doc.push_str(line);
    }
    doc.push('\n');
    doc.into_bytes()
}

pub fn target() -> IngestTarget {
    IngestTarget {
        transaction_file_id: Uuid::new_v4(),
        company_id: Uuid::new_v4(),
        warehouse_id: Uuid::new_v4(),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub location_lookups: usize,
    pub location_creates: usize,
    pub item_lookups: usize,
    pub item_creates: usize,
    pub location_item_links: usize,
    pub warehouse_item_links: usize,
    pub file_location_links: usize,
    pub file_item_links: usize,
    pub record_creates: usize,
}

#[derive(Debug, Default)]
struct Failures {
    /// 1-based index of the location create call that fails
    location_create: Option<usize>,
    /// 1-based index of the record create call that fails
    record_create: Option<usize>,
    warehouse_link: bool,
    /// 1-based index of the location-item link call that fails
    location_item_link: Option<usize>,
    file_location_link: bool,
    file_item_link: bool,
}

#[derive(Debug, Default)]
pub struct MemoryState {
    pub locations: Vec<location::Model>,
    pub items: Vec<item::Model>,
    pub records: Vec<transaction_record::Model>,
    pub location_items: BTreeSet<(Uuid, Uuid)>,
    pub warehouse_items: BTreeSet<(Uuid, Uuid)>,
    pub file_locations: BTreeSet<(Uuid, Uuid)>,
    pub file_items: BTreeSet<(Uuid, Uuid)>,
    pub calls: CallCounts,
    failures: Failures,
}

/// In-memory implementation of every store the pipeline talks to.
///
/// Clones share state, so a test can keep one handle for inspection while the
/// service owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStores {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stores(&self) -> IngestionStores {
        IngestionStores {
            locations: Arc::new(self.clone()),
            items: Arc::new(self.clone()),
            warehouses: Arc::new(self.clone()),
            records: Arc::new(self.clone()),
            files: Arc::new(self.clone()),
        }
    }

    pub fn service(&self) -> IngestionService {
        IngestionService::new(self.stores(), &IngestConfig::default())
    }

    pub fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory store poisoned")
    }

    pub fn calls(&self) -> CallCounts {
        self.state().calls
    }

    pub fn reset_calls(&self) {
        self.state().calls = CallCounts::default();
    }

    pub fn fail_location_create_on(&self, n: usize) {
        self.state().failures.location_create = Some(n);
    }

    pub fn fail_record_create_on(&self, n: usize) {
        self.state().failures.record_create = Some(n);
    }

    pub fn fail_warehouse_links(&self) {
        self.state().failures.warehouse_link = true;
    }

    pub fn fail_location_item_link_on(&self, n: usize) {
        self.state().failures.location_item_link = Some(n);
    }

    pub fn fail_file_location_links(&self) {
        self.state().failures.file_location_link = true;
    }

    pub fn fail_file_item_links(&self) {
        self.state().failures.file_item_link = true;
    }

    pub fn seed_location(&self, warehouse_id: Uuid, path: &str) -> Uuid {
        let model = new_location(NewLocation {
            warehouse_id,
            location_path: path.to_string(),
            location_name_path: String::new(),
        });
        let id = model.id;
        self.state().locations.push(model);
        id
    }

    pub fn seed_item(&self, company_id: Uuid, name: &str) -> Uuid {
        let model = new_item(NewItem {
            company_id,
            name: name.to_string(),
        });
        let id = model.id;
        self.state().items.push(model);
        id
    }

    pub fn location_by_path(&self, path: &str) -> Option<location::Model> {
        self.state()
            .locations
            .iter()
            .find(|l| l.location_path == path)
            .cloned()
    }

    pub fn item_by_name(&self, name: &str) -> Option<item::Model> {
        self.state().items.iter().find(|i| i.name == name).cloned()
    }
}

fn new_location(input: NewLocation) -> location::Model {
    let now = Utc::now();
    location::Model {
        id: Uuid::new_v4(),
        warehouse_id: input.warehouse_id,
        location_path: input.location_path,
        location_name_path: input.location_name_path,
        created_at: now,
        updated_at: now,
    }
}

fn new_item(input: NewItem) -> item::Model {
    let now = Utc::now();
    item::Model {
        id: Uuid::new_v4(),
        company_id: input.company_id,
        name: input.name,
        created_at: now,
        updated_at: now,
    }
}

fn injected(what: &str) -> ServiceError {
    ServiceError::db_error(format!("injected {} failure", what))
}

fn insert_link(set: &mut BTreeSet<(Uuid, Uuid)>, pair: (Uuid, Uuid)) -> LinkOutcome {
    if set.insert(pair) {
        LinkOutcome::Created
    } else {
        LinkOutcome::AlreadyLinked
    }
}

#[async_trait]
impl LocationStore for MemoryStores {
    async fn get_by_path(
        &self,
        warehouse_id: Uuid,
        location_path: &str,
    ) -> Result<Option<location::Model>, ServiceError> {
        let mut state = self.state();
        state.calls.location_lookups += 1;
        Ok(state
            .locations
            .iter()
            .find(|l| l.warehouse_id == warehouse_id && l.location_path == location_path)
            .cloned())
    }

    async fn create(&self, location: NewLocation) -> Result<location::Model, ServiceError> {
        let mut state = self.state();
        state.calls.location_creates += 1;
        if state.failures.location_create == Some(state.calls.location_creates) {
            return Err(injected("location create"));
        }
        let model = new_location(location);
        state.locations.push(model.clone());
        Ok(model)
    }

    async fn link_item(
        &self,
        location_id: Uuid,
        item_id: Uuid,
    ) -> Result<LinkOutcome, ServiceError> {
        let mut state = self.state();
        state.calls.location_item_links += 1;
        if state.failures.location_item_link == Some(state.calls.location_item_links) {
            return Err(injected("location-item link"));
        }
        Ok(insert_link(&mut state.location_items, (location_id, item_id)))
    }
}

#[async_trait]
impl ItemStore for MemoryStores {
    async fn get_by_name(
        &self,
        company_id: Uuid,
        name: &str,
    ) -> Result<Option<item::Model>, ServiceError> {
        let mut state = self.state();
        state.calls.item_lookups += 1;
        Ok(state
            .items
            .iter()
            .find(|i| i.company_id == company_id && i.name == name)
            .cloned())
    }

    async fn create(&self, item: NewItem) -> Result<item::Model, ServiceError> {
        let mut state = self.state();
        state.calls.item_creates += 1;
        let model = new_item(item);
        state.items.push(model.clone());
        Ok(model)
    }
}

#[async_trait]
impl WarehouseStore for MemoryStores {
    async fn link_item(
        &self,
        warehouse_id: Uuid,
        item_id: Uuid,
    ) -> Result<LinkOutcome, ServiceError> {
        let mut state = self.state();
        state.calls.warehouse_item_links += 1;
        if state.failures.warehouse_link {
            return Err(injected("warehouse link"));
        }
        Ok(insert_link(&mut state.warehouse_items, (warehouse_id, item_id)))
    }
}

#[async_trait]
impl TransactionRecordStore for MemoryStores {
    async fn create(
        &self,
        record: NewTransactionRecord,
    ) -> Result<transaction_record::Model, ServiceError> {
        let mut state = self.state();
        state.calls.record_creates += 1;
        if state.failures.record_create == Some(state.calls.record_creates) {
            return Err(injected("record create"));
        }
        let now = Utc::now();
        let model = transaction_record::Model {
            id: Uuid::new_v4(),
            company_id: record.company_id,
            warehouse_id: record.warehouse_id,
            location_id: record.location_id,
            transaction_file_id: Some(record.transaction_file_id),
            item_id: record.item_id,
            transaction_type: record.transaction_type,
            order_name: record.order_name,
            description: record.description,
            transaction_quantity: record.transaction_quantity,
            completed_quantity: record.completed_quantity,
            completed_date: record.completed_date,
            created_at: now,
            updated_at: now,
        };
        state.records.push(model.clone());
        Ok(model)
    }
}

#[async_trait]
impl TransactionFileStore for MemoryStores {
    async fn link_location(
        &self,
        transaction_file_id: Uuid,
        location_id: Uuid,
    ) -> Result<LinkOutcome, ServiceError> {
        let mut state = self.state();
        state.calls.file_location_links += 1;
        if state.failures.file_location_link {
            return Err(injected("file-location link"));
        }
        Ok(insert_link(
            &mut state.file_locations,
            (transaction_file_id, location_id),
        ))
    }

    async fn link_item(
        &self,
        transaction_file_id: Uuid,
        item_id: Uuid,
    ) -> Result<LinkOutcome, ServiceError> {
        let mut state = self.state();
        state.calls.file_item_links += 1;
        if state.failures.file_item_link {
            return Err(injected("file-item link"));
        }
        Ok(insert_link(&mut state.file_items, (transaction_file_id, item_id)))
    }
}

/// In-memory SQLite pool with the schema applied and foreign keys enforced.
///
/// One connection keeps every query on the same in-memory database.
pub async fn sqlite_pool() -> Arc<DbPool> {
    let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .expect("sqlite connection");
    pool.execute_unprepared("PRAGMA foreign_keys = ON")
        .await
        .expect("enable foreign keys");
    db::run_migrations(&pool).await.expect("migrations");
    Arc::new(pool)
}
