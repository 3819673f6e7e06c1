use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One parsed line of a supplier bill, waiting to be confirmed into stock.
/// `item_id` is null when the line should create a brand-new item.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bill_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub bill_id: Uuid,
    pub item_id: Option<Uuid>,
    pub item_name: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    pub unit: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_price: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::supplier_bill::Entity",
        from = "Column::BillId",
        to = "super::supplier_bill::Column::Id"
    )]
    SupplierBill,
}

impl Related<super::supplier_bill::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplierBill.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
