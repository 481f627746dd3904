use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Notifications published after an ingestion run finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TransactionFileIngested {
        transaction_file_id: Uuid,
        company_id: Uuid,
        warehouse_id: Uuid,
        records_created: u64,
    },
    TransactionFileIngestFailed {
        transaction_file_id: Uuid,
        company_id: Uuid,
        records_created: u64,
        reason: String,
    },
}

impl Event {
    pub fn transaction_file_id(&self) -> Uuid {
        match self {
            Event::TransactionFileIngested {
                transaction_file_id,
                ..
            }
            | Event::TransactionFileIngestFailed {
                transaction_file_id,
                ..
            } => *transaction_file_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, waiting for channel capacity
    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))
    }

    /// Sends an event, logging instead of failing when the receiver is gone
    pub async fn send_or_log(&self, event: Event) {
        let transaction_file_id = event.transaction_file_id();
        if let Err(e) = self.send(event).await {
            warn!(%transaction_file_id, error = %e, "dropping ingestion event");
        }
    }
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::TransactionFileIngested {
                transaction_file_id,
                warehouse_id,
                records_created,
                ..
            } => info!(
                %transaction_file_id,
                %warehouse_id,
                records_created,
                "transaction file ingested"
            ),
            Event::TransactionFileIngestFailed {
                transaction_file_id,
                records_created,
                reason,
                ..
            } => warn!(
                %transaction_file_id,
                records_created,
                reason = %reason,
                "transaction file ingestion failed"
            ),
        }
    }

    info!("Event processing loop stopped");
}
