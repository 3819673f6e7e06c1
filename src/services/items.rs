use crate::{
    db::DbPool,
    entities::{
        item::{self, Entity as Item, UnitOfMeasure},
        stock_movement,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Input for creating an inventory item by hand (as opposed to items
/// created on the fly by bill confirmation).
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub unit: UnitOfMeasure,
    pub unit_price: Option<Decimal>,
    pub track_stock: bool,
    pub par_level: Option<Decimal>,
    pub category: Option<String>,
    /// Opening stock; when positive, an `initial` movement is recorded.
    pub opening_quantity: Option<Decimal>,
}

/// Metadata-only update. Quantity, price and value are ledger-owned and
/// change only through movements.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub unit: Option<UnitOfMeasure>,
    pub par_level: Option<Option<Decimal>>,
    pub category: Option<Option<String>>,
    pub track_stock: Option<bool>,
}

#[derive(Clone)]
pub struct ItemService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ItemService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates an item. A positive opening quantity is applied as an
    /// `initial` movement in the same transaction, so the balance-after
    /// chain starts consistent.
    #[instrument(skip(self, new_item), fields(name = %new_item.name))]
    pub async fn create_item(&self, new_item: NewItem) -> Result<item::Model, ServiceError> {
        if new_item.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Item name cannot be empty".to_string(),
            ));
        }
        if let Some(price) = new_item.unit_price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Unit price cannot be negative".to_string(),
                ));
            }
        }
        let opening = new_item.opening_quantity.unwrap_or(Decimal::ZERO);
        if opening < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Opening quantity cannot be negative".to_string(),
            ));
        }

        let db = self.db.as_ref();
        let created = db
            .transaction::<_, item::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let id = Uuid::new_v4();
                    let total_value = new_item.unit_price.map(|p| opening * p);
                    let active = item::ActiveModel {
                        id: Set(id),
                        name: Set(new_item.name.clone()),
                        unit: Set(new_item.unit.as_str().to_string()),
                        quantity: Set(opening),
                        unit_price: Set(new_item.unit_price),
                        total_value: Set(total_value),
                        track_stock: Set(new_item.track_stock),
                        par_level: Set(new_item.par_level),
                        category: Set(new_item.category.clone()),
                        is_active: Set(true),
                        created_at: Set(Utc::now()),
                        updated_at: Set(None),
                    };
                    let created = active.insert(txn).await.map_err(ServiceError::db_error)?;

                    if opening > Decimal::ZERO && created.track_stock {
                        let movement = stock_movement::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            item_id: Set(created.id),
                            kind: Set(stock_movement::MovementKind::Initial.as_str().to_string()),
                            quantity: Set(opening),
                            balance_after: Set(opening),
                            unit_price: Set(created.unit_price),
                            total_value: Set(total_value),
                            reference_id: Set(None),
                            reference_type: Set(None),
                            reason: Set("initial stocking".to_string()),
                            created_at: Set(Utc::now()),
                        };
                        movement.insert(txn).await.map_err(ServiceError::db_error)?;
                    }

                    Ok(created)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(item_id = %created.id, name = %created.name, "item created");
        self.emit(Event::ItemCreated(created.id)).await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: Uuid) -> Result<item::Model, ServiceError> {
        let db = self.db.as_ref();
        Item::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .filter(|i| i.is_active)
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))
    }

    /// Lists active items, optionally narrowed by category.
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        category: Option<String>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<item::Model>, u64), ServiceError> {
        let db = self.db.as_ref();

        let mut query = Item::find().filter(item::Column::IsActive.eq(true));
        if let Some(category) = category {
            query = query.filter(item::Column::Category.eq(category));
        }

        let paginator = query
            .order_by_asc(item::Column::Name)
            .paginate(db, per_page.max(1));
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Updates item metadata. Ledger-owned fields are untouchable here.
    #[instrument(skip(self, update))]
    pub async fn update_item(
        &self,
        item_id: Uuid,
        update: ItemUpdate,
    ) -> Result<item::Model, ServiceError> {
        let existing = self.get_item(item_id).await?;

        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Item name cannot be empty".to_string(),
                ));
            }
        }
        if let Some(Some(par)) = update.par_level {
            if par < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Par level cannot be negative".to_string(),
                ));
            }
        }

        let db = self.db.as_ref();
        let mut active: item::ActiveModel = existing.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(unit) = update.unit {
            active.unit = Set(unit.as_str().to_string());
        }
        if let Some(par_level) = update.par_level {
            active.par_level = Set(par_level);
        }
        if let Some(category) = update.category {
            active.category = Set(category);
        }
        if let Some(track_stock) = update.track_stock {
            active.track_stock = Set(track_stock);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await.map_err(ServiceError::db_error)?;

        info!(item_id = %updated.id, "item updated");
        self.emit(Event::ItemUpdated(updated.id)).await;

        Ok(updated)
    }

    /// Soft delete. Movement history stays; recipe lines referencing the
    /// item are removed by the schema's cascade rules on hard deletes
    /// only, so costing keeps seeing the last known price.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_item(item_id).await?;

        let db = self.db.as_ref();
        let mut active: item::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await.map_err(ServiceError::db_error)?;

        info!(item_id = %item_id, "item deleted");
        self.emit(Event::ItemDeleted(item_id)).await;

        Ok(())
    }

    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("failed to emit domain event: {}", e);
        }
    }
}
