use crate::{
    db::DbPool,
    entities::{
        bill_line::{self, Entity as BillLine},
        dish::Entity as Dish,
        dispute::{self, DisputeStatus, Entity as Dispute},
        item::{self, Entity as Item},
        recipe_line::{self, Entity as RecipeLine},
        stock_movement::{self, Entity as StockMovement, MovementKind, ReferenceType},
        supplier_bill::{self, BillStatus, Entity as SupplierBill},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionError, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Metadata stamped onto a bill at confirmation time.
#[derive(Debug, Clone, Default)]
pub struct BillMetadata {
    pub supplier_name: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub total_amount: Option<Decimal>,
}

/// Outcome of one movement applied by a ledger operation.
#[derive(Debug, Clone)]
pub struct MovementResult {
    pub movement_id: Uuid,
    pub item_id: Uuid,
    pub kind: MovementKind,
    pub quantity: Decimal,
    pub balance_after: Decimal,
    pub total_value: Option<Decimal>,
    /// Set when the operation created the item (bill line without item id).
    pub item_created: bool,
    par_level: Option<Decimal>,
}

impl MovementResult {
    pub fn is_below_par(&self) -> bool {
        matches!(self.par_level, Some(par) if self.balance_after <= par)
    }
}

/// The stock ledger: applies inventory-affecting events as atomic,
/// auditable movements and keeps each item's cached quantity, unit price
/// and total value consistent with its movement history.
///
/// Every mutating operation runs inside a single database transaction
/// covering all item updates and movement inserts it produces; row-level
/// locking in the database serializes concurrent writers on the same item.
#[derive(Clone)]
pub struct StockLedgerService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl StockLedgerService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Confirms a draft bill: applies every line as an inbound delivery and
    /// stamps the bill with supplier/date/total metadata, all in one
    /// transaction. Lines without an item id create the item on the fly.
    ///
    /// Either every line of the bill is applied and its movement recorded,
    /// or none are. Partial application would corrupt the balance-after
    /// invariant.
    #[instrument(skip(self, metadata))]
    pub async fn confirm_bill(
        &self,
        bill_id: Uuid,
        metadata: BillMetadata,
    ) -> Result<Vec<MovementResult>, ServiceError> {
        let db = self.db.as_ref();

        let bill = SupplierBill::find_by_id(bill_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Bill {} not found", bill_id)))?;

        if bill.bill_status() != Some(BillStatus::Draft) {
            return Err(ServiceError::Conflict(format!(
                "Bill {} is already confirmed",
                bill_id
            )));
        }

        let lines = BillLine::find()
            .filter(bill_line::Column::BillId.eq(bill_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        if lines.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "Bill {} has no lines to confirm",
                bill_id
            )));
        }

        // Reject malformed lines before the transaction starts.
        for line in &lines {
            if line.quantity <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Line '{}': delivered quantity must be positive",
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

        let results = db
            .transaction::<_, Vec<MovementResult>, ServiceError>(move |txn| {
                Box::pin(async move {
                    // Re-check under the transaction: a concurrent confirm
                    // must not apply the same bill twice.
                    let bill = SupplierBill::find_by_id(bill_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Bill {} not found", bill_id))
                        })?;
                    if bill.bill_status() != Some(BillStatus::Draft) {
                        return Err(ServiceError::Conflict(format!(
                            "Bill {} is already confirmed",
                            bill_id
                        )));
                    }

                    let mut results = Vec::with_capacity(lines.len());
                    for line in &lines {
                        let result = apply_delivery_line(txn, bill_id, line).await?;
                        results.push(result);
                    }

                    // Stamp the bill in the same transaction.
                    let mut active_bill: supplier_bill::ActiveModel = bill.into();
                    if metadata.supplier_name.is_some() {
                        active_bill.supplier_name = Set(metadata.supplier_name.clone());
                    }
                    if metadata.bill_date.is_some() {
                        active_bill.bill_date = Set(metadata.bill_date);
                    }
                    if metadata.total_amount.is_some() {
                        active_bill.total_amount = Set(metadata.total_amount);
                    }
                    active_bill.status = Set(BillStatus::Confirmed.as_str().to_string());
                    active_bill.confirmed_at = Set(Some(Utc::now()));
                    active_bill.updated_at = Set(Some(Utc::now()));
                    active_bill
                        .update(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    Ok(results)
                })
            })
            .await
            .map_err(unwrap_txn_error)?;

        info!(
            bill_id = %bill_id,
            lines = results.len(),
            "bill confirmed and applied to stock"
        );

        self.emit(Event::BillConfirmed {
            bill_id,
            line_count: results.len(),
        })
        .await;
        self.emit_movement_events(&results).await;

        Ok(results)
    }

    /// Resolves an open dispute by applying its signed quantity delta to
    /// the item as an adjustment movement, in one transaction with the
    /// dispute status flip. The resulting quantity may go negative.
    #[instrument(skip(self))]
    pub async fn resolve_dispute(&self, dispute_id: Uuid) -> Result<MovementResult, ServiceError> {
        let db = self.db.as_ref();

        let found = Dispute::find_by_id(dispute_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Dispute {} not found", dispute_id)))?;

        if found.dispute_status() != Some(DisputeStatus::Open) {
            return Err(ServiceError::Conflict(format!(
                "Dispute {} is already resolved",
                dispute_id
            )));
        }

        if found.quantity_delta == Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Dispute quantity delta cannot be zero".to_string(),
            ));
        }

        let result = db
            .transaction::<_, MovementResult, ServiceError>(move |txn| {
                Box::pin(async move {
                    let disputed = Dispute::find_by_id(dispute_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Dispute {} not found", dispute_id))
                        })?;
                    if disputed.dispute_status() != Some(DisputeStatus::Open) {
                        return Err(ServiceError::Conflict(format!(
                            "Dispute {} is already resolved",
                            dispute_id
                        )));
                    }

                    let item = Item::find_by_id(disputed.item_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Item {} not found", disputed.item_id))
                        })?;

                    let reason = format!("dispute resolution: {}", disputed.reason);
                    let result = apply_movement(
                        txn,
                        &item,
                        MovementKind::Adjustment,
                        disputed.quantity_delta,
                        None,
                        Some((dispute_id, ReferenceType::Dispute)),
                        reason,
                    )
                    .await?;

                    let mut active: dispute::ActiveModel = disputed.into();
                    active.status = Set(DisputeStatus::Resolved.as_str().to_string());
                    active.resolved_at = Set(Some(Utc::now()));
                    active.updated_at = Set(Some(Utc::now()));
                    active.update(txn).await.map_err(ServiceError::db_error)?;

                    Ok(result)
                })
            })
            .await
            .map_err(unwrap_txn_error)?;

        info!(
            dispute_id = %dispute_id,
            item_id = %result.item_id,
            delta = %result.quantity,
            balance_after = %result.balance_after,
            "dispute resolved"
        );

        self.emit(Event::DisputeResolved {
            dispute_id,
            item_id: result.item_id,
            quantity_delta: result.quantity,
        })
        .await;
        self.emit_movement_events(std::slice::from_ref(&result)).await;

        Ok(result)
    }

    /// Records the sale of a dish: deducts `recipe quantity × quantity
    /// sold` of every ingredient via outbound movements, in one
    /// transaction across all ingredients. A missing ingredient item
    /// aborts the whole sale; quantities are allowed to go negative
    /// (out-of-stock detection is a reporting concern, not a ledger
    /// invariant).
    #[instrument(skip(self))]
    pub async fn record_sale(
        &self,
        dish_id: Uuid,
        quantity_sold: Decimal,
        sale_id: Uuid,
    ) -> Result<Vec<MovementResult>, ServiceError> {
        if quantity_sold <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Quantity sold must be positive".to_string(),
            ));
        }

        let db = self.db.as_ref();

        let results = db
            .transaction::<_, Vec<MovementResult>, ServiceError>(move |txn| {
                Box::pin(async move {
                    let sold_dish = Dish::find_by_id(dish_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Dish {} not found", dish_id))
                        })?;

                    let recipe = RecipeLine::find()
                        .filter(recipe_line::Column::DishId.eq(dish_id))
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let mut results = Vec::with_capacity(recipe.len());
                    for line in &recipe {
                        let item = Item::find_by_id(line.item_id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Ingredient item {} of dish '{}' not found",
                                    line.item_id, sold_dish.name
                                ))
                            })?;

                        if !item.track_stock {
                            continue;
                        }

                        let consumed = line.quantity * quantity_sold;
                        let result = apply_movement(
                            txn,
                            &item,
                            MovementKind::Outbound,
                            consumed,
                            None,
                            Some((sale_id, ReferenceType::Sale)),
                            "sale".to_string(),
                        )
                        .await?;
                        results.push(result);
                    }

                    Ok(results)
                })
            })
            .await
            .map_err(unwrap_txn_error)?;

        info!(
            dish_id = %dish_id,
            sale_id = %sale_id,
            quantity = %quantity_sold,
            ingredients = results.len(),
            "sale recorded against stock"
        );

        self.emit(Event::SaleRecorded {
            sale_id,
            dish_id,
            quantity: quantity_sold,
        })
        .await;
        self.emit_movement_events(&results).await;

        Ok(results)
    }

    /// Movement history for an item, newest first.
    #[instrument(skip(self))]
    pub async fn movement_history(
        &self,
        item_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<stock_movement::Model>, u64), ServiceError> {
        let db = self.db.as_ref();

        Item::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        let paginator = StockMovement::find()
            .filter(stock_movement::Column::ItemId.eq(item_id))
            .order_by_desc(stock_movement::Column::CreatedAt)
            .paginate(db, per_page.max(1));

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let movements = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((movements, total))
    }

    /// Items at or below their par level. Only trackable, active items
    /// with a configured par level are reported.
    #[instrument(skip(self))]
    pub async fn low_stock_items(&self) -> Result<Vec<item::Model>, ServiceError> {
        let db = self.db.as_ref();

        Item::find()
            .filter(item::Column::IsActive.eq(true))
            .filter(item::Column::TrackStock.eq(true))
            .filter(item::Column::ParLevel.is_not_null())
            .filter(Expr::col(item::Column::Quantity).lte(Expr::col(item::Column::ParLevel)))
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("failed to emit domain event: {}", e);
        }
    }

    async fn emit_movement_events(&self, results: &[MovementResult]) {
        for result in results {
            self.emit(Event::StockMovementRecorded {
                movement_id: result.movement_id,
                item_id: result.item_id,
                kind: result.kind.as_str().to_string(),
                balance_after: result.balance_after,
            })
            .await;

            if let (true, Some(par)) = (result.is_below_par(), result.par_level) {
                self.emit(Event::LowStock {
                    item_id: result.item_id,
                    quantity: result.balance_after,
                    par_level: par,
                })
                .await;
            }
        }
    }
}

/// Applies one delivery line inside the bill-confirmation transaction:
/// creates the item when the line carries no item id, then records the
/// inbound movement with the delivery's price.
async fn apply_delivery_line(
    txn: &DatabaseTransaction,
    bill_id: Uuid,
    line: &bill_line::Model,
) -> Result<MovementResult, ServiceError> {
    let (item, item_created) = match line.item_id {
        Some(item_id) => {
            let existing = Item::find_by_id(item_id)
                .one(txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Item {} referenced by bill line '{}' not found",
                        item_id, line.item_name
                    ))
                })?;
            (existing, false)
        }
        None => {
            let new_item = item::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(line.item_name.clone()),
                unit: Set(line.unit.clone()),
                quantity: Set(Decimal::ZERO),
                unit_price: Set(Some(line.unit_price)),
                total_value: Set(Some(Decimal::ZERO)),
                track_stock: Set(true),
                par_level: Set(None),
                category: Set(None),
                is_active: Set(true),
                created_at: Set(Utc::now()),
                updated_at: Set(None),
            };
            let created = new_item.insert(txn).await.map_err(ServiceError::db_error)?;

            // Backfill the line so the audit trail points at the item.
            let mut active_line: bill_line::ActiveModel = line.clone().into();
            active_line.item_id = Set(Some(created.id));
            active_line
                .update(txn)
                .await
                .map_err(ServiceError::db_error)?;

            (created, true)
        }
    };

    let mut result = apply_movement(
        txn,
        &item,
        MovementKind::Inbound,
        line.quantity,
        Some(line.unit_price),
        Some((bill_id, ReferenceType::SupplierBill)),
        "bill confirmation".to_string(),
    )
    .await?;
    result.item_created = item_created;

    Ok(result)
}

/// Core ledger step: computes the new balance, rewrites the item's cached
/// quantity/price/value and appends the movement with its balance-after
/// snapshot. Must be called inside the operation's transaction.
async fn apply_movement(
    txn: &DatabaseTransaction,
    item: &item::Model,
    kind: MovementKind,
    quantity: Decimal,
    delivery_price: Option<Decimal>,
    reference: Option<(Uuid, ReferenceType)>,
    reason: String,
) -> Result<MovementResult, ServiceError> {
    let new_quantity = match kind {
        MovementKind::Inbound | MovementKind::Initial => item.quantity + quantity,
        MovementKind::Outbound => item.quantity - quantity,
        // Adjustments carry a signed delta.
        MovementKind::Adjustment => item.quantity + quantity,
    };

    // A delivery replaces the unit price; every other movement keeps it.
    let unit_price = delivery_price.or(item.unit_price);
    let total_value = unit_price.map(|price| new_quantity * price);

    let mut active_item: item::ActiveModel = item.clone().into();
    active_item.quantity = Set(new_quantity);
    active_item.unit_price = Set(unit_price);
    active_item.total_value = Set(total_value);
    active_item.updated_at = Set(Some(Utc::now()));
    active_item
        .update(txn)
        .await
        .map_err(ServiceError::db_error)?;

    let movement_id = Uuid::new_v4();
    let movement = stock_movement::ActiveModel {
        id: Set(movement_id),
        item_id: Set(item.id),
        kind: Set(kind.as_str().to_string()),
        quantity: Set(quantity),
        balance_after: Set(new_quantity),
        unit_price: Set(unit_price),
        total_value: Set(total_value),
        reference_id: Set(reference.map(|(id, _)| id)),
        reference_type: Set(reference.map(|(_, rt)| rt.as_str().to_string())),
        reason: Set(reason),
        created_at: Set(Utc::now()),
    };
    movement.insert(txn).await.map_err(ServiceError::db_error)?;

    Ok(MovementResult {
        movement_id,
        item_id: item.id,
        kind,
        quantity,
        balance_after: new_quantity,
        total_value,
        item_created: false,
        par_level: item.par_level,
    })
}

fn unwrap_txn_error(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}
