mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use slotter_ingest::{
    config::IngestConfig,
    errors::{EntityKind, IngestError, LinkKind},
    events::{Event, EventSender},
    services::ingestion::{ColumnVocabulary, IngestTarget, IngestionService},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use common::{csv, target, CallCounts, MemoryStores};

fn pick_row(order: usize, item: &str, zone: &str, aisle: &str) -> String {
    format!("PICK,SO-{order},pick,{item},1,1,2024-02-01,{zone},{aisle}")
}

fn document(rows: &[String]) -> Vec<u8> {
    let lines: Vec<&str> = rows.iter().map(String::as_str).collect();
    csv(&lines)
}

#[tokio::test]
async fn reference_row_produces_linked_record() {
    let stores = MemoryStores::new();
    let target = target();
    let bytes = b"item number,transaction type,order number,description,transaction quantity,completed date,completed quantity,zone,aisle\n\
SKU-1,INBOUND,PO-100,restock,10,2024-01-05,10,A,3\n";

    let report = stores
        .service()
        .ingest(bytes, "upload.csv", target)
        .await
        .expect("ingest");
    assert_eq!(report.records_created, 1);
    assert_eq!(report.locations_created, 1);
    assert_eq!(report.items_created, 1);

    let location = stores.location_by_path("A/3").expect("location created");
    assert_eq!(location.location_name_path, "Zone=A|Aisle=3");
    assert_eq!(location.warehouse_id, target.warehouse_id);
    let item = stores.item_by_name("SKU-1").expect("item created");
    assert_eq!(item.company_id, target.company_id);

    let state = stores.state();
    let record = &state.records[0];
    assert_eq!(record.transaction_type, "INBOUND");
    assert_eq!(record.order_name, "PO-100");
    assert_eq!(record.description, "restock");
    assert_eq!(record.transaction_quantity, 10);
    assert_eq!(record.completed_quantity, 10);
    assert_eq!(record.completed_date, NaiveDate::from_ymd_opt(2024, 1, 5));
    assert_eq!(record.location_id, location.id);
    assert_eq!(record.item_id, item.id);
    assert_eq!(record.transaction_file_id, Some(target.transaction_file_id));
    assert_eq!(record.company_id, target.company_id);
    assert_eq!(record.warehouse_id, target.warehouse_id);

    assert!(state.location_items.contains(&(location.id, item.id)));
    assert!(state.warehouse_items.contains(&(target.warehouse_id, item.id)));
    assert!(state
        .file_locations
        .contains(&(target.transaction_file_id, location.id)));
    assert!(state.file_items.contains(&(target.transaction_file_id, item.id)));
}

#[tokio::test]
async fn store_is_consulted_once_per_distinct_key() {
    let stores = MemoryStores::new();
    let zones = ["A", "B", "C"];
    let rows: Vec<String> = (0..60)
        .map(|i| pick_row(i, &format!("SKU-{}", i % 4), zones[i % 3], "1"))
        .collect();

    let report = stores
        .service()
        .ingest(&document(&rows), "picks.csv", target())
        .await
        .expect("ingest");

    assert_eq!(report.records_created, 60);
    assert_eq!(report.rows_read, 60);
    assert_eq!(
        stores.calls(),
        CallCounts {
            location_lookups: 3,
            location_creates: 3,
            item_lookups: 4,
            item_creates: 4,
            location_item_links: 12,
            warehouse_item_links: 4,
            file_location_links: 3,
            file_item_links: 4,
            record_creates: 60,
        }
    );
    assert_eq!(report.location_item_links_created, 12);
    assert_eq!(report.file_links_created, 7);
}

#[tokio::test]
async fn second_run_reuses_entities_and_adds_records() {
    let stores = MemoryStores::new();
    let target = target();
    let rows = vec![
        pick_row(1, "SKU-1", "A", "1"),
        pick_row(2, "SKU-2", "A", "2"),
        pick_row(3, "SKU-1", "B", "1"),
    ];
    let bytes = document(&rows);
    let service = stores.service();

    let first = service.ingest(&bytes, "picks.csv", target).await.expect("first run");
    let (locations, items, links) = {
        let state = stores.state();
        (
            state.locations.len(),
            state.items.len(),
            state.location_items.clone(),
        )
    };

    let second = service.ingest(&bytes, "picks.csv", target).await.expect("second run");

    assert_eq!(first.records_created, 3);
    assert_eq!(second.records_created, 3);
    assert_eq!(second.locations_created, 0);
    assert_eq!(second.locations_reused, 3);
    assert_eq!(second.items_created, 0);
    assert_eq!(second.items_reused, 2);
    assert_eq!(second.location_item_links_created, 0);
    assert_eq!(second.file_links_created, 0);

    let state = stores.state();
    assert_eq!(state.locations.len(), locations);
    assert_eq!(state.items.len(), items);
    assert_eq!(state.location_items, links);
    assert_eq!(state.records.len(), 6);
}

#[tokio::test]
async fn row_without_item_number_creates_nothing() {
    let stores = MemoryStores::new();
    let rows = vec![pick_row(1, "", "A", "1"), pick_row(2, "SKU-2", "A", "1")];

    let report = stores
        .service()
        .ingest(&document(&rows), "picks.csv", target())
        .await
        .expect("ingest");

    assert_eq!(report.records_created, 1);
    assert_eq!(report.rows_unresolved, 1);
    assert!(stores.item_by_name("").is_none());
    let calls = stores.calls();
    assert_eq!(calls.item_lookups, 1);
    assert_eq!(calls.record_creates, 1);
}

#[tokio::test]
async fn row_without_location_values_creates_nothing() {
    let stores = MemoryStores::new();
    let rows = vec![pick_row(1, "SKU-1", "", ""), pick_row(2, "SKU-1", "A", "")];

    let report = stores
        .service()
        .ingest(&document(&rows), "picks.csv", target())
        .await
        .expect("ingest");

    assert_eq!(report.records_created, 1);
    assert_eq!(report.rows_unresolved, 1);
    assert_eq!(stores.calls().location_lookups, 1);
    let location = stores.location_by_path("A").expect("single-level location");
    assert_eq!(location.location_name_path, "Zone=A");
}

#[tokio::test]
async fn malformed_row_is_skipped() {
    let stores = MemoryStores::new();
    let rows = vec![
        pick_row(1, "SKU-1", "A", "1"),
        "PICK,SO-2,short row".to_string(),
        pick_row(3, "SKU-3", "A", "1"),
    ];

    let report = stores
        .service()
        .ingest(&document(&rows), "picks.csv", target())
        .await
        .expect("ingest");

    assert_eq!(report.records_created, 2);
    assert_eq!(report.rows_skipped, 1);
    assert_eq!(stores.state().records.len(), 2);
}

#[tokio::test]
async fn one_location_with_two_items() {
    let stores = MemoryStores::new();
    let rows = vec![pick_row(1, "SKU-1", "A", "1"), pick_row(2, "SKU-2", "A", "1")];

    stores
        .service()
        .ingest(&document(&rows), "picks.csv", target())
        .await
        .expect("ingest");

    let state = stores.state();
    assert_eq!(state.locations.len(), 1);
    assert_eq!(state.items.len(), 2);
    assert_eq!(state.location_items.len(), 2);
    assert!(state
        .location_items
        .iter()
        .all(|(location_id, _)| *location_id == state.locations[0].id));
}

#[tokio::test]
async fn location_failure_reports_records_already_written() {
    let stores = MemoryStores::new();
    stores.fail_location_create_on(3);
    let rows: Vec<String> = ["A", "B", "C", "D", "E"]
        .iter()
        .enumerate()
        .map(|(i, zone)| pick_row(i, "SKU-1", zone, "1"))
        .collect();

    let failure = stores
        .service()
        .ingest(&document(&rows), "picks.csv", target())
        .await
        .expect_err("third location create fails");

    assert_eq!(failure.records_created, 2);
    assert_matches!(
        failure.error,
        IngestError::EntityResolution { kind: EntityKind::Location, ref key, .. } if key == "C/1"
    );

    let state = stores.state();
    assert_eq!(state.locations.len(), 2);
    assert_eq!(state.records.len(), 2);
    assert!(state.file_locations.is_empty());
    assert!(state.file_items.is_empty());
}

#[tokio::test]
async fn record_failure_stops_the_run() {
    let stores = MemoryStores::new();
    stores.fail_record_create_on(2);
    let rows: Vec<String> = (0..4).map(|i| pick_row(i, "SKU-1", "A", "1")).collect();

    let failure = stores
        .service()
        .ingest(&document(&rows), "picks.csv", target())
        .await
        .expect_err("second record fails");

    assert_eq!(failure.records_created, 1);
    assert_matches!(failure.error, IngestError::RecordCreation(_));
    assert_eq!(stores.calls().record_creates, 2);
}

#[tokio::test]
async fn warehouse_link_failure_is_fatal() {
    let stores = MemoryStores::new();
    stores.fail_warehouse_links();
    let rows = vec![pick_row(1, "SKU-1", "A", "1")];

    let failure = stores
        .service()
        .ingest(&document(&rows), "picks.csv", target())
        .await
        .expect_err("warehouse link fails");

    assert_eq!(failure.records_created, 0);
    assert_matches!(
        failure.error,
        IngestError::Link {
            kind: LinkKind::WarehouseItem,
            ..
        }
    );
}

#[tokio::test]
async fn location_item_link_failure_keeps_earlier_records() {
    let stores = MemoryStores::new();
    stores.fail_location_item_link_on(2);
    let rows = vec![
        pick_row(1, "SKU-1", "A", "1"),
        pick_row(2, "SKU-1", "B", "1"),
        pick_row(3, "SKU-1", "C", "1"),
    ];

    let failure = stores
        .service()
        .ingest(&document(&rows), "picks.csv", target())
        .await
        .expect_err("second pair link fails");

    assert_eq!(failure.records_created, 1);
    assert_matches!(
        failure.error,
        IngestError::Link {
            kind: LinkKind::LocationItem,
            ..
        }
    );
    let state = stores.state();
    assert_eq!(state.records.len(), 1);
    assert_eq!(state.location_items.len(), 1);
    assert!(state.file_locations.is_empty());
}

#[tokio::test]
async fn file_location_link_failure_reports_every_record() {
    let stores = MemoryStores::new();
    stores.fail_file_location_links();
    let rows = vec![
        pick_row(1, "SKU-1", "A", "1"),
        pick_row(2, "SKU-2", "A", "1"),
        pick_row(3, "SKU-1", "B", "2"),
    ];

    let failure = stores
        .service()
        .ingest(&document(&rows), "picks.csv", target())
        .await
        .expect_err("file link fails");

    assert_eq!(failure.records_created, 3);
    assert_matches!(
        failure.error,
        IngestError::Link {
            kind: LinkKind::FileLocation,
            ..
        }
    );
    let state = stores.state();
    assert_eq!(state.records.len(), 3);
    assert!(state.file_locations.is_empty());
    assert!(state.file_items.is_empty());
    assert_eq!(state.calls.file_location_links, 1);
    assert_eq!(state.calls.file_item_links, 0);
}

#[tokio::test]
async fn file_item_link_failure_reports_every_record() {
    let stores = MemoryStores::new();
    stores.fail_file_item_links();
    let rows = vec![pick_row(1, "SKU-1", "A", "1"), pick_row(2, "SKU-2", "B", "1")];

    let failure = stores
        .service()
        .ingest(&document(&rows), "picks.csv", target())
        .await
        .expect_err("file item link fails");

    assert_eq!(failure.records_created, 2);
    assert_matches!(
        failure.error,
        IngestError::Link {
            kind: LinkKind::FileItem,
            ..
        }
    );
    let state = stores.state();
    assert_eq!(state.file_locations.len(), 2);
    assert!(state.file_items.is_empty());
}

#[tokio::test]
async fn vocabulary_without_extracted_columns_still_reads_them() {
    let stores = MemoryStores::new();
    let service = stores
        .service()
        .with_vocabulary(ColumnVocabulary::new(["transaction type"]));

    service
        .ingest(
            &csv(&["PICK,SO-1,pick,SKU-1,4,3,2024-02-01,A,7"]),
            "picks.csv",
            target(),
        )
        .await
        .expect("ingest");

    let location = stores.location_by_path("A/7").expect("zone and aisle only");
    assert_eq!(location.location_name_path, "Zone=A|Aisle=7");
    assert!(stores.item_by_name("SKU-1").is_some());
    let state = stores.state();
    assert_eq!(state.records[0].transaction_quantity, 4);
    assert_eq!(state.records[0].completed_quantity, 3);
}

#[tokio::test]
async fn existing_entities_are_reused_within_scope() {
    let stores = MemoryStores::new();
    let target = target();
    let location_id = stores.seed_location(target.warehouse_id, "A/1");
    let item_id = stores.seed_item(target.company_id, "SKU-1");
    // Same keys under another warehouse and company must not match.
    stores.seed_location(Uuid::new_v4(), "B/1");
    stores.seed_item(Uuid::new_v4(), "SKU-2");

    let rows = vec![pick_row(1, "SKU-1", "A", "1"), pick_row(2, "SKU-2", "B", "1")];
    let report = stores
        .service()
        .ingest(&document(&rows), "picks.csv", target)
        .await
        .expect("ingest");

    assert_eq!(report.locations_reused, 1);
    assert_eq!(report.locations_created, 1);
    assert_eq!(report.items_reused, 1);
    assert_eq!(report.items_created, 1);
    // Only the new item is linked to the warehouse.
    assert_eq!(stores.calls().warehouse_item_links, 1);

    let state = stores.state();
    assert_eq!(state.records[0].location_id, location_id);
    assert_eq!(state.records[0].item_id, item_id);
    assert_ne!(state.records[1].location_id, location_id);
    assert!(!state.warehouse_items.contains(&(target.warehouse_id, item_id)));
}

#[tokio::test]
async fn unparseable_values_fall_back() {
    let stores = MemoryStores::new();
    let rows = vec!["MOVE,SO-1,move,SKU-1,12abc,seven,05/01/2024,A,1".to_string()];

    stores
        .service()
        .ingest(&document(&rows), "moves.csv", target())
        .await
        .expect("ingest");

    let state = stores.state();
    assert_eq!(state.records[0].transaction_quantity, 12);
    assert_eq!(state.records[0].completed_quantity, 0);
    assert_eq!(state.records[0].completed_date, None);
}

#[tokio::test]
async fn unsupported_formats_touch_no_store() {
    let stores = MemoryStores::new();
    let service = stores.service();
    let bytes = csv(&["PICK,SO-1,pick,SKU-1,1,1,2024-02-01,A,1"]);

    let failure = service
        .ingest(&bytes, "inventory.pdf", target())
        .await
        .expect_err("pdf rejected");
    assert_eq!(failure.records_created, 0);
    assert_matches!(failure.error, IngestError::UnsupportedFormat(ref ext) if ext == ".pdf");

    let failure = service
        .ingest(&bytes, "legacy.XLS", target())
        .await
        .expect_err("xls rejected");
    assert_matches!(failure.error, IngestError::NotImplemented(ref ext) if ext == ".xls");

    let failure = service
        .ingest(&bytes, "no_extension", target())
        .await
        .expect_err("missing extension rejected");
    assert_matches!(failure.error, IngestError::UnsupportedFormat(_));

    assert_eq!(stores.calls(), CallCounts::default());
}

#[tokio::test]
async fn empty_and_header_only_files_succeed() {
    let stores = MemoryStores::new();
    let service = stores.service();

    let report = service.ingest(b"", "empty.csv", target()).await.expect("empty");
    assert_eq!(report.records_created, 0);

    let report = service
        .ingest(&csv(&[]), "header.csv", target())
        .await
        .expect("header only");
    assert_eq!(report.records_created, 0);
    assert_eq!(report.rows_read, 0);
    assert_eq!(stores.calls(), CallCounts::default());
}

#[tokio::test]
async fn cancelled_run_stops_before_first_row() {
    let stores = MemoryStores::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let failure = stores
        .service()
        .ingest_with_cancellation(
            &csv(&["PICK,SO-1,pick,SKU-1,1,1,2024-02-01,A,1"]),
            "picks.csv",
            target(),
            &cancel,
        )
        .await
        .expect_err("cancelled");

    assert_matches!(failure.error, IngestError::Cancelled);
    assert_eq!(failure.records_created, 0);
    assert_eq!(stores.calls(), CallCounts::default());
}

#[tokio::test]
async fn invalid_targets_are_rejected() {
    let stores = MemoryStores::new();
    let service = stores.service();
    let bytes = csv(&["PICK,SO-1,pick,SKU-1,1,1,2024-02-01,A,1"]);

    let nil_warehouse = IngestTarget {
        warehouse_id: Uuid::nil(),
        ..target()
    };
    let failure = service
        .ingest(&bytes, "picks.csv", nil_warehouse)
        .await
        .expect_err("nil warehouse");
    assert_matches!(failure.error, IngestError::InvalidTarget(_));

    let small = IngestionService::new(
        stores.stores(),
        &IngestConfig {
            max_file_bytes: 16,
            ..IngestConfig::default()
        },
    );
    let failure = small
        .ingest(&bytes, "picks.csv", target())
        .await
        .expect_err("too large");
    assert_matches!(failure.error, IngestError::FileTooLarge { limit: 16, .. });

    assert_eq!(stores.calls(), CallCounts::default());
}

#[tokio::test]
async fn custom_vocabulary_changes_location_columns() {
    let stores = MemoryStores::new();
    let mut columns: Vec<String> = slotter_ingest::config::DEFAULT_KNOWN_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .collect();
    columns.push("zone".to_string());

    let service = stores.service().with_vocabulary(ColumnVocabulary::new(columns));
    service
        .ingest(
            &csv(&["PICK,SO-1,pick,SKU-1,1,1,2024-02-01,A,7"]),
            "picks.csv",
            target(),
        )
        .await
        .expect("ingest");

    let location = stores.location_by_path("7").expect("aisle-only location");
    assert_eq!(location.location_name_path, "Aisle=7");
}

#[tokio::test]
async fn outcome_events_are_published() {
    let stores = MemoryStores::new();
    let (tx, mut rx) = mpsc::channel(8);
    let service = stores.service().with_event_sender(EventSender::new(tx));
    let target = target();

    service
        .ingest(
            &csv(&["PICK,SO-1,pick,SKU-1,1,1,2024-02-01,A,1"]),
            "picks.csv",
            target,
        )
        .await
        .expect("ingest");
    assert_eq!(
        rx.try_recv().expect("success event"),
        Event::TransactionFileIngested {
            transaction_file_id: target.transaction_file_id,
            company_id: target.company_id,
            warehouse_id: target.warehouse_id,
            records_created: 1,
        }
    );

    service
        .ingest(b"", "picks.txt", target)
        .await
        .expect_err("unsupported");
    assert_matches!(
        rx.try_recv().expect("failure event"),
        Event::TransactionFileIngestFailed { records_created: 0, ref reason, .. }
            if reason == "unsupported file extension: .txt"
    );
}

#[tokio::test]
async fn dropped_event_receiver_does_not_fail_ingestion() {
    let stores = MemoryStores::new();
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let service = stores.service().with_event_sender(EventSender::new(tx));

    let report = service
        .ingest(
            &csv(&["PICK,SO-1,pick,SKU-1,1,1,2024-02-01,A,1"]),
            "picks.csv",
            target(),
        )
        .await
        .expect("ingest");
    assert_eq!(report.records_created, 1);
}
