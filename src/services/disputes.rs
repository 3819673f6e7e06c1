use crate::{
    db::DbPool,
    entities::{
        dispute::{self, DisputeStatus, Entity as Dispute},
        item::Entity as Item,
        supplier_bill::Entity as SupplierBill,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewDispute {
    pub bill_id: Option<Uuid>,
    pub item_id: Uuid,
    /// Signed quantity change to apply when the dispute is resolved.
    pub quantity_delta: Decimal,
    pub reason: String,
}

/// Dispute bookkeeping. Resolution applies stock changes and lives in
/// [`crate::services::stock_ledger::StockLedgerService`].
#[derive(Clone)]
pub struct DisputeService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl DisputeService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, new_dispute), fields(item_id = %new_dispute.item_id))]
    pub async fn open_dispute(
        &self,
        new_dispute: NewDispute,
    ) -> Result<dispute::Model, ServiceError> {
        if new_dispute.quantity_delta == Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Dispute quantity delta cannot be zero".to_string(),
            ));
        }
        if new_dispute.reason.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Dispute reason cannot be empty".to_string(),
            ));
        }

        let db = self.db.as_ref();

        Item::find_by_id(new_dispute.item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Item {} not found", new_dispute.item_id))
            })?;

        if let Some(bill_id) = new_dispute.bill_id {
            SupplierBill::find_by_id(bill_id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| ServiceError::NotFound(format!("Bill {} not found", bill_id)))?;
        }

        let active = dispute::ActiveModel {
            id: Set(Uuid::new_v4()),
            bill_id: Set(new_dispute.bill_id),
            item_id: Set(new_dispute.item_id),
            quantity_delta: Set(new_dispute.quantity_delta),
            reason: Set(new_dispute.reason.clone()),
            status: Set(DisputeStatus::Open.as_str().to_string()),
            resolved_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let created = active.insert(db).await.map_err(ServiceError::db_error)?;

        info!(dispute_id = %created.id, item_id = %created.item_id, "dispute opened");
        self.emit(Event::DisputeOpened(created.id)).await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_dispute(&self, dispute_id: Uuid) -> Result<dispute::Model, ServiceError> {
        let db = self.db.as_ref();
        Dispute::find_by_id(dispute_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Dispute {} not found", dispute_id)))
    }

    /// Lists disputes, optionally filtered by status, newest first.
    #[instrument(skip(self))]
    pub async fn list_disputes(
        &self,
        status: Option<DisputeStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<dispute::Model>, u64), ServiceError> {
        let db = self.db.as_ref();

        let mut query = Dispute::find();
        if let Some(status) = status {
            query = query.filter(dispute::Column::Status.eq(status.as_str()));
        }

        let paginator = query
            .order_by_desc(dispute::Column::CreatedAt)
            .paginate(db, per_page.max(1));
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let disputes = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((disputes, total))
    }

    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("failed to emit domain event: {}", e);
        }
    }
}
