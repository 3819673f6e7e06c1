use crate::{
    db::DbPool,
    entities::{
        dish::{self, Entity as Dish},
        item::Entity as Item,
        recipe_line::{self, Entity as RecipeLine},
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

/// One ingredient requirement when creating or replacing a recipe.
#[derive(Debug, Clone)]
pub struct NewRecipeLine {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit: String,
}

#[derive(Debug, Clone)]
pub struct NewDish {
    pub name: String,
    pub description: Option<String>,
    pub selling_price: Option<Decimal>,
    pub recipe: Vec<NewRecipeLine>,
}

#[derive(Debug, Clone, Default)]
pub struct DishUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub selling_price: Option<Option<Decimal>>,
    pub is_active: Option<bool>,
}

/// A dish together with its recipe lines.
#[derive(Debug, Clone)]
pub struct DishWithRecipe {
    pub dish: dish::Model,
    pub recipe: Vec<recipe_line::Model>,
}

#[derive(Clone)]
pub struct DishService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl DishService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a dish with its recipe lines in one transaction. Every
    /// referenced item must exist.
    #[instrument(skip(self, new_dish), fields(name = %new_dish.name))]
    pub async fn create_dish(&self, new_dish: NewDish) -> Result<DishWithRecipe, ServiceError> {
        validate_dish_name(&new_dish.name)?;
        validate_recipe(&new_dish.recipe)?;

        let db = self.db.as_ref();
        let created = db
            .transaction::<_, DishWithRecipe, ServiceError>(move |txn| {
                Box::pin(async move {
                    let dish_id = Uuid::new_v4();
                    let active = dish::ActiveModel {
                        id: Set(dish_id),
                        name: Set(new_dish.name.clone()),
                        description: Set(new_dish.description.clone()),
                        is_active: Set(true),
                        selling_price: Set(new_dish.selling_price),
                        created_at: Set(Utc::now()),
                        updated_at: Set(None),
                    };
                    let created = active.insert(txn).await.map_err(ServiceError::db_error)?;

                    let mut recipe = Vec::with_capacity(new_dish.recipe.len());
                    for line in &new_dish.recipe {
                        Item::find_by_id(line.item_id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .filter(|i| i.is_active)
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Item {} not found",
                                    line.item_id
                                ))
                            })?;

                        let active_line = recipe_line::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            dish_id: Set(dish_id),
                            item_id: Set(line.item_id),
                            quantity: Set(line.quantity),
                            unit: Set(line.unit.clone()),
                        };
                        recipe.push(
                            active_line
                                .insert(txn)
                                .await
                                .map_err(ServiceError::db_error)?,
                        );
                    }

                    Ok(DishWithRecipe {
                        dish: created,
                        recipe,
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            dish_id = %created.dish.id,
            lines = created.recipe.len(),
            "dish created"
        );
        self.emit(Event::DishCreated(created.dish.id)).await;

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_dish(&self, dish_id: Uuid) -> Result<DishWithRecipe, ServiceError> {
        let db = self.db.as_ref();
        let found = Dish::find_by_id(dish_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .filter(|d| d.is_active)
            .ok_or_else(|| ServiceError::NotFound(format!("Dish {} not found", dish_id)))?;

        let recipe = RecipeLine::find()
            .filter(recipe_line::Column::DishId.eq(dish_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(DishWithRecipe {
            dish: found,
            recipe,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_dishes(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<dish::Model>, u64), ServiceError> {
        let db = self.db.as_ref();
        let paginator = Dish::find()
            .filter(dish::Column::IsActive.eq(true))
            .order_by_asc(dish::Column::Name)
            .paginate(db, per_page.max(1));
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let dishes = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((dishes, total))
    }

    #[instrument(skip(self, update))]
    pub async fn update_dish(
        &self,
        dish_id: Uuid,
        update: DishUpdate,
    ) -> Result<dish::Model, ServiceError> {
        let existing = self.get_dish(dish_id).await?.dish;

        if let Some(name) = &update.name {
            validate_dish_name(name)?;
        }

        let db = self.db.as_ref();
        let mut active: dish::ActiveModel = existing.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(description) = update.description {
            active.description = Set(description);
        }
        if let Some(selling_price) = update.selling_price {
            active.selling_price = Set(selling_price);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await.map_err(ServiceError::db_error)?;

        info!(dish_id = %updated.id, "dish updated");
        self.emit(Event::DishUpdated(updated.id)).await;

        Ok(updated)
    }

    /// Replaces a dish's recipe wholesale: old lines out, new lines in,
    /// one transaction.
    #[instrument(skip(self, recipe))]
    pub async fn replace_recipe(
        &self,
        dish_id: Uuid,
        recipe: Vec<NewRecipeLine>,
    ) -> Result<Vec<recipe_line::Model>, ServiceError> {
        validate_recipe(&recipe)?;
        self.get_dish(dish_id).await?;

        let db = self.db.as_ref();
        let lines = db
            .transaction::<_, Vec<recipe_line::Model>, ServiceError>(move |txn| {
                Box::pin(async move {
                    RecipeLine::delete_many()
                        .filter(recipe_line::Column::DishId.eq(dish_id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let mut inserted = Vec::with_capacity(recipe.len());
                    for line in &recipe {
                        Item::find_by_id(line.item_id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .filter(|i| i.is_active)
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Item {} not found",
                                    line.item_id
                                ))
                            })?;

                        let active_line = recipe_line::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            dish_id: Set(dish_id),
                            item_id: Set(line.item_id),
                            quantity: Set(line.quantity),
                            unit: Set(line.unit.clone()),
                        };
                        inserted.push(
                            active_line
                                .insert(txn)
                                .await
                                .map_err(ServiceError::db_error)?,
                        );
                    }

                    Ok(inserted)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(dish_id = %dish_id, lines = lines.len(), "recipe replaced");
        self.emit(Event::DishUpdated(dish_id)).await;

        Ok(lines)
    }

    #[instrument(skip(self))]
    pub async fn delete_dish(&self, dish_id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_dish(dish_id).await?.dish;

        let db = self.db.as_ref();
        let mut active: dish::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await.map_err(ServiceError::db_error)?;

        info!(dish_id = %dish_id, "dish deleted");
        self.emit(Event::DishDeleted(dish_id)).await;

        Ok(())
    }

    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("failed to emit domain event: {}", e);
        }
    }
}

fn validate_dish_name(name: &str) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "Dish name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_recipe(recipe: &[NewRecipeLine]) -> Result<(), ServiceError> {
    for line in recipe {
        if line.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Recipe line quantity must be positive".to_string(),
            ));
        }
    }
    Ok(())
}
