use crate::{
    db::DbPool,
    entities::{
        bill_line::{self, Entity as BillLine},
        item::{Entity as Item, UnitOfMeasure},
        supplier_bill::{self, BillStatus, Entity as SupplierBill},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// One parsed line of an incoming bill. `item_id` absent means the line
/// creates a new inventory item at confirmation time.
#[derive(Debug, Clone)]
pub struct NewBillLine {
    pub item_id: Option<Uuid>,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: UnitOfMeasure,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewBill {
    pub supplier_name: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub total_amount: Option<Decimal>,
    pub lines: Vec<NewBillLine>,
}

/// A bill with its parsed lines.
#[derive(Debug, Clone)]
pub struct BillWithLines {
    pub bill: supplier_bill::Model,
    pub lines: Vec<bill_line::Model>,
}

/// Draft-bill bookkeeping. Confirmation itself is a ledger operation and
/// lives in [`crate::services::stock_ledger::StockLedgerService`].
#[derive(Clone)]
pub struct BillService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl BillService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Stores a draft bill with its parsed lines in one transaction.
    /// Lines referencing an existing item must point at a real one.
    #[instrument(skip(self, new_bill), fields(lines = new_bill.lines.len()))]
    pub async fn create_bill(&self, new_bill: NewBill) -> Result<BillWithLines, ServiceError> {
        if new_bill.lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "A bill needs at least one line".to_string(),
            ));
        }
        for line in &new_bill.lines {
            if line.item_name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Bill line item name cannot be empty".to_string(),
                ));
            }
            if line.quantity <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Line '{}': quantity must be positive",
                    line.item_name
                )));
            }
            if line.unit_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Line '{}': unit price cannot be negative",
                    line.item_name
                )));
            }
        }

        let db = self.db.as_ref();
        let created = db
            .transaction::<_, BillWithLines, ServiceError>(move |txn| {
                Box::pin(async move {
                    let bill_id = Uuid::new_v4();
                    let active = supplier_bill::ActiveModel {
                        id: Set(bill_id),
                        supplier_name: Set(new_bill.supplier_name.clone()),
                        bill_date: Set(new_bill.bill_date),
                        total_amount: Set(new_bill.total_amount),
                        status: Set(BillStatus::Draft.as_str().to_string()),
                        confirmed_at: Set(None),
                        created_at: Set(Utc::now()),
                        updated_at: Set(None),
                    };
                    let bill = active.insert(txn).await.map_err(ServiceError::db_error)?;

                    let mut lines = Vec::with_capacity(new_bill.lines.len());
                    for line in &new_bill.lines {
                        if let Some(item_id) = line.item_id {
                            Item::find_by_id(item_id)
                                .one(txn)
                                .await
                                .map_err(ServiceError::db_error)?
                                .ok_or_else(|| {
                                    ServiceError::NotFound(format!("Item {} not found", item_id))
                                })?;
                        }

                        let active_line = bill_line::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            bill_id: Set(bill_id),
                            item_id: Set(line.item_id),
                            item_name: Set(line.item_name.clone()),
                            quantity: Set(line.quantity),
                            unit: Set(line.unit.as_str().to_string()),
                            unit_price: Set(line.unit_price),
                        };
                        lines.push(
                            active_line
                                .insert(txn)
                                .await
                                .map_err(ServiceError::db_error)?,
                        );
                    }

                    Ok(BillWithLines { bill, lines })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(bill_id = %created.bill.id, "draft bill created");
        self.emit(Event::BillCreated(created.bill.id)).await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_bill(&self, bill_id: Uuid) -> Result<BillWithLines, ServiceError> {
        let db = self.db.as_ref();
        let bill = SupplierBill::find_by_id(bill_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Bill {} not found", bill_id)))?;

        let lines = BillLine::find()
            .filter(bill_line::Column::BillId.eq(bill_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(BillWithLines { bill, lines })
    }

    /// Lists bills, optionally filtered by status, newest first.
    #[instrument(skip(self))]
    pub async fn list_bills(
        &self,
        status: Option<BillStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<supplier_bill::Model>, u64), ServiceError> {
        let db = self.db.as_ref();

        let mut query = SupplierBill::find();
        if let Some(status) = status {
            query = query.filter(supplier_bill::Column::Status.eq(status.as_str()));
        }

        let paginator = query
            .order_by_desc(supplier_bill::Column::CreatedAt)
            .paginate(db, per_page.max(1));
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let bills = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((bills, total))
    }

    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("failed to emit domain event: {}", e);
        }
    }
}
