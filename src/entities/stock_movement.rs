use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of stock movement. Direction is implied by the kind: `Inbound`
/// and `Initial` increase stock, `Outbound` decreases it, `Adjustment`
/// carries a signed delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Inbound,
    Outbound,
    Adjustment,
    Initial,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Inbound => "inbound",
            MovementKind::Outbound => "outbound",
            MovementKind::Adjustment => "adjustment",
            MovementKind::Initial => "initial",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "inbound" => Some(MovementKind::Inbound),
            "outbound" => Some(MovementKind::Outbound),
            "adjustment" => Some(MovementKind::Adjustment),
            "initial" => Some(MovementKind::Initial),
            _ => None,
        }
    }
}

/// What a movement's `reference_id` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    SupplierBill,
    Dispute,
    Sale,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::SupplierBill => "supplier_bill",
            ReferenceType::Dispute => "dispute",
            ReferenceType::Sale => "sale",
        }
    }
}

/// Append-only ledger record of a single change to an item's quantity.
///
/// `balance_after` is a point-in-time snapshot: it must equal the item's
/// cached quantity immediately after the movement applied and is never
/// recomputed later. Rows in this table are never updated or deleted in
/// normal operation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: Uuid,
    /// Movement kind stored as string; see [`MovementKind`].
    pub kind: String,
    /// Magnitude of the change (signed for adjustments).
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    /// Item quantity immediately after this movement applied.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub balance_after: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_price: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_value: Option<Decimal>,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn movement_kind(&self) -> Option<MovementKind> {
        MovementKind::from_str(&self.kind)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
