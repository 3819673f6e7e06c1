use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Units an inventory item can be measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfMeasure {
    Kg,
    G,
    L,
    Ml,
    Cl,
    Piece,
    Bunch,
    Dozen,
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOfMeasure::Kg => "kg",
            UnitOfMeasure::G => "g",
            UnitOfMeasure::L => "l",
            UnitOfMeasure::Ml => "ml",
            UnitOfMeasure::Cl => "cl",
            UnitOfMeasure::Piece => "piece",
            UnitOfMeasure::Bunch => "bunch",
            UnitOfMeasure::Dozen => "dozen",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "kg" => Some(UnitOfMeasure::Kg),
            "g" => Some(UnitOfMeasure::G),
            "l" => Some(UnitOfMeasure::L),
            "ml" => Some(UnitOfMeasure::Ml),
            "cl" => Some(UnitOfMeasure::Cl),
            "piece" => Some(UnitOfMeasure::Piece),
            "bunch" => Some(UnitOfMeasure::Bunch),
            "dozen" => Some(UnitOfMeasure::Dozen),
            _ => None,
        }
    }

    /// Whether the unit measures mass, volume, or discrete count.
    pub fn is_countable(&self) -> bool {
        matches!(
            self,
            UnitOfMeasure::Piece | UnitOfMeasure::Bunch | UnitOfMeasure::Dozen
        )
    }
}

/// Inventory item with its cached stock state.
///
/// `quantity`, `unit_price` and `total_value` are derived caches maintained
/// by the stock ledger: they always reflect the item's most recent movement
/// and are never edited independently. `total_value` is null whenever the
/// unit price is unknown.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Unit of measure, stored as string; see [`UnitOfMeasure`].
    pub unit: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_price: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_value: Option<Decimal>,
    /// Whether stock movements are recorded for this item at all.
    pub track_stock: bool,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub par_level: Option<Decimal>,
    pub category: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn unit_of_measure(&self) -> Option<UnitOfMeasure> {
        UnitOfMeasure::from_str(&self.unit)
    }

    /// Low-stock check against the configured par level.
    pub fn is_below_par(&self) -> bool {
        matches!(self.par_level, Some(par) if self.quantity <= par)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_movement::Entity")]
    StockMovements,
    #[sea_orm(has_many = "super::recipe_line::Entity")]
    RecipeLines,
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockMovements.def()
    }
}

impl Related<super::recipe_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(UnitOfMeasure::Kg, "kg")]
    #[case(UnitOfMeasure::G, "g")]
    #[case(UnitOfMeasure::L, "l")]
    #[case(UnitOfMeasure::Ml, "ml")]
    #[case(UnitOfMeasure::Cl, "cl")]
    #[case(UnitOfMeasure::Piece, "piece")]
    #[case(UnitOfMeasure::Bunch, "bunch")]
    #[case(UnitOfMeasure::Dozen, "dozen")]
    fn unit_of_measure_round_trips(#[case] unit: UnitOfMeasure, #[case] s: &str) {
        assert_eq!(unit.as_str(), s);
        assert_eq!(UnitOfMeasure::from_str(s), Some(unit));
    }

    #[test]
    fn unknown_unit_is_rejected() {
        assert_eq!(UnitOfMeasure::from_str("crate"), None);
        assert_eq!(UnitOfMeasure::from_str(""), None);
    }

    #[test]
    fn countable_units() {
        assert!(UnitOfMeasure::Piece.is_countable());
        assert!(UnitOfMeasure::Dozen.is_countable());
        assert!(!UnitOfMeasure::Kg.is_countable());
        assert!(!UnitOfMeasure::Ml.is_countable());
    }
}
