use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted after successful state changes. Consumers are
/// in-process only; emission failures never fail the originating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Ledger events
    BillConfirmed {
        bill_id: Uuid,
        line_count: usize,
    },
    StockMovementRecorded {
        movement_id: Uuid,
        item_id: Uuid,
        kind: String,
        balance_after: Decimal,
    },
    DisputeResolved {
        dispute_id: Uuid,
        item_id: Uuid,
        quantity_delta: Decimal,
    },
    SaleRecorded {
        sale_id: Uuid,
        dish_id: Uuid,
        quantity: Decimal,
    },
    LowStock {
        item_id: Uuid,
        quantity: Decimal,
        par_level: Decimal,
    },

    // Catalog events
    ItemCreated(Uuid),
    ItemUpdated(Uuid),
    ItemDeleted(Uuid),
    DishCreated(Uuid),
    DishUpdated(Uuid),
    DishDeleted(Uuid),
    MenuCreated(Uuid),
    MenuUpdated(Uuid),
    MenuDeleted(Uuid),
    BillCreated(Uuid),
    DisputeOpened(Uuid),
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

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes events off the channel and logs them. Runs until every sender
/// is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::LowStock {
                item_id,
                quantity,
                par_level,
            } => {
                warn!(
                    item_id = %item_id,
                    quantity = %quantity,
                    par_level = %par_level,
                    "item at or below par level"
                );
            }
            other => info!(event = ?other, "domain event"),
        }
    }
    info!("event channel closed, processor exiting");
}
