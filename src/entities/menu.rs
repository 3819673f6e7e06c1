use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a menu is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// Dishes priced individually.
    ALaCarte,
    /// One flat price for the whole menu.
    FixedPrice,
    /// One price, diner selects a bounded number of courses from sections.
    Choice,
}

impl PricingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingMode::ALaCarte => "a_la_carte",
            PricingMode::FixedPrice => "fixed_price",
            PricingMode::Choice => "choice",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "a_la_carte" => Some(PricingMode::ALaCarte),
            "fixed_price" => Some(PricingMode::FixedPrice),
            "choice" => Some(PricingMode::Choice),
            _ => None,
        }
    }
}

/// A menu: an ordered set of sections with a pricing mode.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menus")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    /// Pricing mode stored as string; see [`PricingMode`].
    pub pricing_mode: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub fixed_price: Option<Decimal>,
    pub min_courses: Option<i32>,
    pub max_courses: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn mode(&self) -> Option<PricingMode> {
        PricingMode::from_str(&self.pricing_mode)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::menu_section::Entity")]
    MenuSections,
}

impl Related<super::menu_section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MenuSections.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
