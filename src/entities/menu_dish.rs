use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Links a menu section to a dish. `price_override`, when set, supersedes
/// the dish's own selling price within this menu.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menu_dishes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub section_id: Uuid,
    pub dish_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price_override: Option<Decimal>,
    pub position: i32,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::menu_section::Entity",
        from = "Column::SectionId",
        to = "super::menu_section::Column::Id"
    )]
    MenuSection,
    #[sea_orm(
        belongs_to = "super::dish::Entity",
        from = "Column::DishId",
        to = "super::dish::Column::Id"
    )]
    Dish,
}

impl Related<super::menu_section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MenuSection.def()
    }
}

impl Related<super::dish::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dish.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
