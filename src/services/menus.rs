use crate::{
    db::DbPool,
    entities::{
        dish::Entity as Dish,
        menu::{self, Entity as Menu, PricingMode},
        menu_dish::{self, Entity as MenuDish},
        menu_section::{self, Entity as MenuSection},
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

#[derive(Debug, Clone)]
pub struct NewMenuDish {
    pub dish_id: Uuid,
    pub price_override: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMenuSection {
    pub name: String,
    pub is_required: bool,
    pub dishes: Vec<NewMenuDish>,
}

#[derive(Debug, Clone)]
pub struct NewMenu {
    pub name: String,
    pub pricing_mode: PricingMode,
    pub fixed_price: Option<Decimal>,
    pub min_courses: Option<i32>,
    pub max_courses: Option<i32>,
    pub sections: Vec<NewMenuSection>,
}

#[derive(Debug, Clone, Default)]
pub struct MenuUpdate {
    pub name: Option<String>,
    pub fixed_price: Option<Option<Decimal>>,
    pub min_courses: Option<Option<i32>>,
    pub max_courses: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

/// A menu with its full section/dish tree.
#[derive(Debug, Clone)]
pub struct MenuTree {
    pub menu: menu::Model,
    pub sections: Vec<(menu_section::Model, Vec<menu_dish::Model>)>,
}

#[derive(Clone)]
pub struct MenuService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl MenuService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a menu with its ordered sections and dish entries in one
    /// transaction. Every referenced dish must exist.
    #[instrument(skip(self, new_menu), fields(name = %new_menu.name))]
    pub async fn create_menu(&self, new_menu: NewMenu) -> Result<MenuTree, ServiceError> {
        if new_menu.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Menu name cannot be empty".to_string(),
            ));
        }
        if let Some(price) = new_menu.fixed_price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Fixed price cannot be negative".to_string(),
                ));
            }
        }
        if let (Some(min), Some(max)) = (new_menu.min_courses, new_menu.max_courses) {
            if min > max {
                return Err(ServiceError::ValidationError(
                    "Minimum courses cannot exceed maximum courses".to_string(),
                ));
            }
        }

        let db = self.db.as_ref();
        let tree = db
            .transaction::<_, MenuTree, ServiceError>(move |txn| {
                Box::pin(async move {
                    let menu_id = Uuid::new_v4();
                    let active = menu::ActiveModel {
                        id: Set(menu_id),
                        name: Set(new_menu.name.clone()),
                        is_active: Set(true),
                        pricing_mode: Set(new_menu.pricing_mode.as_str().to_string()),
                        fixed_price: Set(new_menu.fixed_price),
                        min_courses: Set(new_menu.min_courses),
                        max_courses: Set(new_menu.max_courses),
                        created_at: Set(Utc::now()),
                        updated_at: Set(None),
                    };
                    let created = active.insert(txn).await.map_err(ServiceError::db_error)?;

                    let mut sections = Vec::with_capacity(new_menu.sections.len());
                    for (position, section) in new_menu.sections.iter().enumerate() {
                        let section_id = Uuid::new_v4();
                        let active_section = menu_section::ActiveModel {
                            id: Set(section_id),
                            menu_id: Set(menu_id),
                            name: Set(section.name.clone()),
                            position: Set(position as i32),
                            is_required: Set(section.is_required),
                        };
                        let created_section = active_section
                            .insert(txn)
                            .await
                            .map_err(ServiceError::db_error)?;

                        let mut entries = Vec::with_capacity(section.dishes.len());
                        for (dish_position, entry) in section.dishes.iter().enumerate() {
                            Dish::find_by_id(entry.dish_id)
                                .one(txn)
                                .await
                                .map_err(ServiceError::db_error)?
                                .ok_or_else(|| {
                                    ServiceError::NotFound(format!(
                                        "Dish {} not found",
                                        entry.dish_id
                                    ))
                                })?;

                            let active_entry = menu_dish::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                section_id: Set(section_id),
                                dish_id: Set(entry.dish_id),
                                price_override: Set(entry.price_override),
                                position: Set(dish_position as i32),
                                notes: Set(entry.notes.clone()),
                            };
                            entries.push(
                                active_entry
                                    .insert(txn)
                                    .await
                                    .map_err(ServiceError::db_error)?,
                            );
                        }

                        sections.push((created_section, entries));
                    }

                    Ok(MenuTree {
                        menu: created,
                        sections,
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            menu_id = %tree.menu.id,
            sections = tree.sections.len(),
            "menu created"
        );
        self.emit(Event::MenuCreated(tree.menu.id)).await;

        Ok(tree)
    }

    #[instrument(skip(self))]
    pub async fn get_menu(&self, menu_id: Uuid) -> Result<MenuTree, ServiceError> {
        let db = self.db.as_ref();
        let found = Menu::find_by_id(menu_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .filter(|m| m.is_active)
            .ok_or_else(|| ServiceError::NotFound(format!("Menu {} not found", menu_id)))?;

        let sections = MenuSection::find()
            .filter(menu_section::Column::MenuId.eq(menu_id))
            .order_by_asc(menu_section::Column::Position)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut tree_sections = Vec::with_capacity(sections.len());
        for section in sections {
            let entries = MenuDish::find()
                .filter(menu_dish::Column::SectionId.eq(section.id))
                .order_by_asc(menu_dish::Column::Position)
                .all(db)
                .await
                .map_err(ServiceError::db_error)?;
            tree_sections.push((section, entries));
        }

        Ok(MenuTree {
            menu: found,
            sections: tree_sections,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_menus(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<menu::Model>, u64), ServiceError> {
        let db = self.db.as_ref();
        let paginator = Menu::find()
            .filter(menu::Column::IsActive.eq(true))
            .order_by_asc(menu::Column::Name)
            .paginate(db, per_page.max(1));
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let menus = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((menus, total))
    }

    #[instrument(skip(self, update))]
    pub async fn update_menu(
        &self,
        menu_id: Uuid,
        update: MenuUpdate,
    ) -> Result<menu::Model, ServiceError> {
        let existing = self.get_menu(menu_id).await?.menu;

        if let Some(Some(price)) = update.fixed_price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Fixed price cannot be negative".to_string(),
                ));
            }
        }

        let db = self.db.as_ref();
        let mut active: menu::ActiveModel = existing.into();
        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Menu name cannot be empty".to_string(),
                ));
            }
            active.name = Set(name);
        }
        if let Some(fixed_price) = update.fixed_price {
            active.fixed_price = Set(fixed_price);
        }
        if let Some(min_courses) = update.min_courses {
            active.min_courses = Set(min_courses);
        }
        if let Some(max_courses) = update.max_courses {
            active.max_courses = Set(max_courses);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await.map_err(ServiceError::db_error)?;

        info!(menu_id = %updated.id, "menu updated");
        self.emit(Event::MenuUpdated(updated.id)).await;

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_menu(&self, menu_id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_menu(menu_id).await?.menu;

        let db = self.db.as_ref();
        let mut active: menu::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        active.update(db).await.map_err(ServiceError::db_error)?;

        info!(menu_id = %menu_id, "menu deleted");
        self.emit(Event::MenuDeleted(menu_id)).await;

        Ok(())
    }

    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("failed to emit domain event: {}", e);
        }
    }
}
