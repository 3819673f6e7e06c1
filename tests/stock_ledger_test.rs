//! Integration tests for the stock ledger: bill confirmation, dispute
//! resolution, sale recording and the cached-state invariants.

mod common;

use assert_matches::assert_matches;
use backhouse_api::{
    entities::{
        item::{Entity as Item, UnitOfMeasure},
        stock_movement::{self, Entity as StockMovement, MovementKind},
        supplier_bill::BillStatus,
    },
    errors::ServiceError,
    services::{
        bills::{NewBill, NewBillLine},
        dishes::{NewDish, NewRecipeLine},
        disputes::NewDispute,
        items::NewItem,
        stock_ledger::BillMetadata,
    },
};
use chrono::NaiveDate;
use common::{seed_item, setup, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

async fn draft_bill_for_new_item(
    app: &TestApp,
    item_name: &str,
    quantity: Decimal,
    unit_price: Decimal,
) -> Uuid {
    app.services
        .bills
        .create_bill(NewBill {
            supplier_name: Some("Metro".to_string()),
            bill_date: NaiveDate::from_ymd_opt(2024, 3, 14),
            total_amount: Some(quantity * unit_price),
            lines: vec![NewBillLine {
                item_id: None,
                item_name: item_name.to_string(),
                quantity,
                unit: UnitOfMeasure::Kg,
                unit_price,
            }],
        })
        .await
        .expect("failed to create draft bill")
        .bill
        .id
}

async fn movements_for(app: &TestApp, item_id: Uuid) -> Vec<stock_movement::Model> {
    StockMovement::find()
        .filter(stock_movement::Column::ItemId.eq(item_id))
        .all(app.db.as_ref())
        .await
        .expect("failed to query movements")
}

/// Creating an item via bill confirmation with quantity 5 and price 2.00,
/// then reading it back, yields quantity 5, price 2.00, value 10.00 and
/// exactly one inbound movement with balance-after 5.
#[tokio::test]
async fn bill_confirmation_round_trip() {
    let app = setup().await;
    let bill_id = draft_bill_for_new_item(&app, "Chanterelles", dec!(5), dec!(2.00)).await;

    let results = app
        .services
        .stock_ledger
        .confirm_bill(bill_id, BillMetadata::default())
        .await
        .expect("confirmation failed");

    assert_eq!(results.len(), 1);
    assert!(results[0].item_created);
    assert_eq!(results[0].balance_after, dec!(5));

    let item = app
        .services
        .items
        .get_item(results[0].item_id)
        .await
        .expect("item readable after confirmation");
    assert_eq!(item.quantity, dec!(5));
    assert_eq!(item.unit_price, Some(dec!(2.00)));
    assert_eq!(item.total_value, Some(dec!(10.00)));

    let movements = movements_for(&app, item.id).await;
    assert_eq!(movements.len(), 1);
    let movement = &movements[0];
    assert_eq!(movement.movement_kind(), Some(MovementKind::Inbound));
    assert_eq!(movement.quantity, dec!(5));
    assert_eq!(movement.balance_after, dec!(5));
    assert_eq!(movement.reason, "bill confirmation");
    assert_eq!(movement.reference_id, Some(bill_id));
    assert_eq!(movement.reference_type.as_deref(), Some("supplier_bill"));

    let bill = app
        .services
        .bills
        .get_bill(bill_id)
        .await
        .expect("bill readable")
        .bill;
    assert_eq!(bill.bill_status(), Some(BillStatus::Confirmed));
    assert!(bill.confirmed_at.is_some());
    assert_eq!(bill.supplier_name.as_deref(), Some("Metro"));
}

/// A delivery onto an existing item adds to the quantity, replaces the
/// unit price with the delivery's, and recomputes the cached value.
#[tokio::test]
async fn delivery_replaces_price_and_recomputes_value() {
    let app = setup().await;
    let item_id = seed_item(&app, "Butter", dec!(10), Some(dec!(1.50))).await;

    let bill = app
        .services
        .bills
        .create_bill(NewBill {
            supplier_name: None,
            bill_date: None,
            total_amount: None,
            lines: vec![NewBillLine {
                item_id: Some(item_id),
                item_name: "Butter".to_string(),
                quantity: dec!(4),
                unit: UnitOfMeasure::Kg,
                unit_price: dec!(2.00),
            }],
        })
        .await
        .unwrap();

    app.services
        .stock_ledger
        .confirm_bill(bill.bill.id, BillMetadata::default())
        .await
        .unwrap();

    let item = app.services.items.get_item(item_id).await.unwrap();
    assert_eq!(item.quantity, dec!(14));
    assert_eq!(item.unit_price, Some(dec!(2.00)));
    assert_eq!(item.total_value, Some(dec!(28.00)));
}

/// If any line of a multi-line bill fails, no movement from that bill
/// exists afterwards and no quantity changed.
#[tokio::test]
async fn bill_confirmation_rolls_back_whole_bill() {
    let app = setup().await;
    let good_item = seed_item(&app, "Cream", dec!(10), Some(dec!(3.00))).await;
    let doomed_item = seed_item(&app, "Eggs", dec!(30), Some(dec!(0.25))).await;

    let bill = app
        .services
        .bills
        .create_bill(NewBill {
            supplier_name: None,
            bill_date: None,
            total_amount: None,
            lines: vec![
                NewBillLine {
                    item_id: Some(good_item),
                    item_name: "Cream".to_string(),
                    quantity: dec!(2),
                    unit: UnitOfMeasure::L,
                    unit_price: dec!(3.10),
                },
                NewBillLine {
                    item_id: Some(doomed_item),
                    item_name: "Eggs".to_string(),
                    quantity: dec!(12),
                    unit: UnitOfMeasure::Piece,
                    unit_price: dec!(0.30),
                },
            ],
        })
        .await
        .unwrap();

    // Pull the second item out from under the bill before confirming.
    Item::delete_by_id(doomed_item)
        .exec(app.db.as_ref())
        .await
        .unwrap();

    let err = app
        .services
        .stock_ledger
        .confirm_bill(bill.bill.id, BillMetadata::default())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    // First line must not have been applied.
    let item = app.services.items.get_item(good_item).await.unwrap();
    assert_eq!(item.quantity, dec!(10));
    assert_eq!(item.unit_price, Some(dec!(3.00)));
    assert!(movements_for(&app, good_item)
        .await
        .iter()
        .all(|m| m.movement_kind() == Some(MovementKind::Initial)));

    // And the bill is still a draft.
    let bill = app.services.bills.get_bill(bill.bill.id).await.unwrap().bill;
    assert_eq!(bill.bill_status(), Some(BillStatus::Draft));
}

#[tokio::test]
async fn confirming_a_bill_twice_is_a_conflict() {
    let app = setup().await;
    let bill_id = draft_bill_for_new_item(&app, "Flour", dec!(25), dec!(0.80)).await;

    app.services
        .stock_ledger
        .confirm_bill(bill_id, BillMetadata::default())
        .await
        .unwrap();

    let err = app
        .services
        .stock_ledger
        .confirm_bill(bill_id, BillMetadata::default())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

/// Resolving a dispute applies the signed delta as an adjustment movement
/// and flips the dispute, atomically.
#[tokio::test]
async fn dispute_resolution_adjusts_stock() {
    let app = setup().await;
    let item_id = seed_item(&app, "Salmon", dec!(10), Some(dec!(2.00))).await;

    let dispute = app
        .services
        .disputes
        .open_dispute(NewDispute {
            bill_id: None,
            item_id,
            quantity_delta: dec!(-3),
            reason: "short delivery".to_string(),
        })
        .await
        .unwrap();

    let result = app
        .services
        .stock_ledger
        .resolve_dispute(dispute.id)
        .await
        .unwrap();
    assert_eq!(result.kind, MovementKind::Adjustment);
    assert_eq!(result.balance_after, dec!(7));

    let item = app.services.items.get_item(item_id).await.unwrap();
    assert_eq!(item.quantity, dec!(7));
    assert_eq!(item.total_value, Some(dec!(14.00)));

    let movements = movements_for(&app, item_id).await;
    let adjustment = movements
        .iter()
        .find(|m| m.movement_kind() == Some(MovementKind::Adjustment))
        .expect("adjustment movement recorded");
    assert_eq!(adjustment.quantity, dec!(-3));
    assert_eq!(adjustment.balance_after, dec!(7));
    assert_eq!(adjustment.reference_id, Some(dispute.id));
    assert_eq!(adjustment.reference_type.as_deref(), Some("dispute"));
    assert!(adjustment.reason.contains("short delivery"));

    // Resolving again is a conflict, with no further stock change.
    let err = app
        .services
        .stock_ledger
        .resolve_dispute(dispute.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
    let item = app.services.items.get_item(item_id).await.unwrap();
    assert_eq!(item.quantity, dec!(7));
}

/// Selling a dish deducts recipe-quantity × quantity-sold of every
/// ingredient via outbound movements.
#[tokio::test]
async fn sale_decrements_every_ingredient() {
    let app = setup().await;
    let flour = seed_item(&app, "Flour", dec!(10), Some(dec!(1.00))).await;
    let tomato = seed_item(&app, "Tomato", dec!(5), Some(dec!(0.50))).await;

    let dish = app
        .services
        .dishes
        .create_dish(NewDish {
            name: "Pizza Margherita".to_string(),
            description: None,
            selling_price: Some(dec!(11.00)),
            recipe: vec![
                NewRecipeLine {
                    item_id: flour,
                    quantity: dec!(0.2),
                    unit: "kg".to_string(),
                },
                NewRecipeLine {
                    item_id: tomato,
                    quantity: dec!(1),
                    unit: "piece".to_string(),
                },
            ],
        })
        .await
        .unwrap();

    let sale_id = Uuid::new_v4();
    let results = app
        .services
        .stock_ledger
        .record_sale(dish.dish.id, dec!(3), sale_id)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);

    let flour_after = app.services.items.get_item(flour).await.unwrap();
    assert_eq!(flour_after.quantity, dec!(9.4));
    assert_eq!(flour_after.total_value, Some(dec!(9.4)));

    let tomato_after = app.services.items.get_item(tomato).await.unwrap();
    assert_eq!(tomato_after.quantity, dec!(2));

    for item_id in [flour, tomato] {
        let movements = movements_for(&app, item_id).await;
        let outbound = movements
            .iter()
            .find(|m| m.movement_kind() == Some(MovementKind::Outbound))
            .expect("outbound movement recorded");
        assert_eq!(outbound.reason, "sale");
        assert_eq!(outbound.reference_id, Some(sale_id));
        assert_eq!(outbound.reference_type.as_deref(), Some("sale"));
    }
}

/// Overselling is permitted: the ledger records negative balances and
/// leaves out-of-stock detection to reporting.
#[tokio::test]
async fn sale_may_drive_stock_negative() {
    let app = setup().await;
    let truffle = seed_item(&app, "Truffle", dec!(1), Some(dec!(80.00))).await;

    let dish = app
        .services
        .dishes
        .create_dish(NewDish {
            name: "Truffle pasta".to_string(),
            description: None,
            selling_price: Some(dec!(28.00)),
            recipe: vec![NewRecipeLine {
                item_id: truffle,
                quantity: dec!(1),
                unit: "piece".to_string(),
            }],
        })
        .await
        .unwrap();

    app.services
        .stock_ledger
        .record_sale(dish.dish.id, dec!(5), Uuid::new_v4())
        .await
        .unwrap();

    let item = app.services.items.get_item(truffle).await.unwrap();
    assert_eq!(item.quantity, dec!(-4));
    assert_eq!(item.total_value, Some(dec!(-320.00)));
}

#[tokio::test]
async fn sale_of_unknown_dish_is_not_found() {
    let app = setup().await;
    let err = app
        .services
        .stock_ledger
        .record_sale(Uuid::new_v4(), dec!(1), Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = app
        .services
        .stock_ledger
        .record_sale(Uuid::new_v4(), dec!(0), Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

/// After any sequence of movements, the item's cached quantity equals the
/// last movement's balance-after, and the cached value stays
/// quantity × unit price.
#[tokio::test]
async fn cached_state_tracks_movement_chain() {
    let app = setup().await;
    let item_id = seed_item(&app, "Olive oil", dec!(5), Some(dec!(8.00))).await;

    // Delivery +3 at a new price.
    let bill = app
        .services
        .bills
        .create_bill(NewBill {
            supplier_name: None,
            bill_date: None,
            total_amount: None,
            lines: vec![NewBillLine {
                item_id: Some(item_id),
                item_name: "Olive oil".to_string(),
                quantity: dec!(3),
                unit: UnitOfMeasure::L,
                unit_price: dec!(9.00),
            }],
        })
        .await
        .unwrap();
    app.services
        .stock_ledger
        .confirm_bill(bill.bill.id, BillMetadata::default())
        .await
        .unwrap();

    // Dispute -2.
    let dispute = app
        .services
        .disputes
        .open_dispute(NewDispute {
            bill_id: Some(bill.bill.id),
            item_id,
            quantity_delta: dec!(-2),
            reason: "rancid bottles returned".to_string(),
        })
        .await
        .unwrap();
    app.services
        .stock_ledger
        .resolve_dispute(dispute.id)
        .await
        .unwrap();

    // Sale -1.
    let dish = app
        .services
        .dishes
        .create_dish(NewDish {
            name: "Confit".to_string(),
            description: None,
            selling_price: None,
            recipe: vec![NewRecipeLine {
                item_id,
                quantity: dec!(1),
                unit: "l".to_string(),
            }],
        })
        .await
        .unwrap();
    app.services
        .stock_ledger
        .record_sale(dish.dish.id, dec!(1), Uuid::new_v4())
        .await
        .unwrap();

    let item = app.services.items.get_item(item_id).await.unwrap();
    assert_eq!(item.quantity, dec!(5));
    assert_eq!(item.unit_price, Some(dec!(9.00)));
    assert_eq!(item.total_value, Some(item.quantity * dec!(9.00)));

    // 4 movements: initial, inbound, adjustment, outbound; the cached
    // quantity equals the balance-after of the latest one.
    let (history, total) = app
        .services
        .stock_ledger
        .movement_history(item_id, 1, 50)
        .await
        .unwrap();
    assert_eq!(total, 4);
    assert_eq!(history.len(), 4);
    assert!(history
        .iter()
        .any(|m| m.balance_after == item.quantity
            && m.movement_kind() == Some(MovementKind::Outbound)));

    // Every movement snapshots a consistent value when priced.
    for movement in &history {
        if let (Some(price), Some(value)) = (movement.unit_price, movement.total_value) {
            assert_eq!(value, movement.balance_after * price);
        }
    }
}

#[tokio::test]
async fn items_without_price_have_null_value() {
    let app = setup().await;
    let item_id = seed_item(&app, "Foraged herbs", dec!(2), None).await;

    let item = app.services.items.get_item(item_id).await.unwrap();
    assert_eq!(item.unit_price, None);
    assert_eq!(item.total_value, None);

    let movements = movements_for(&app, item_id).await;
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].total_value, None);
}

#[tokio::test]
async fn low_stock_reports_items_at_or_below_par() {
    let app = setup().await;

    let low = app
        .services
        .items
        .create_item(NewItem {
            name: "Capers".to_string(),
            unit: UnitOfMeasure::G,
            unit_price: Some(dec!(0.04)),
            track_stock: true,
            par_level: Some(dec!(500)),
            category: None,
            opening_quantity: Some(dec!(120)),
        })
        .await
        .unwrap();

    let fine = app
        .services
        .items
        .create_item(NewItem {
            name: "Rice".to_string(),
            unit: UnitOfMeasure::Kg,
            unit_price: Some(dec!(1.20)),
            track_stock: true,
            par_level: Some(dec!(5)),
            category: None,
            opening_quantity: Some(dec!(40)),
        })
        .await
        .unwrap();

    let report = app.services.stock_ledger.low_stock_items().await.unwrap();
    let ids: Vec<Uuid> = report.iter().map(|i| i.id).collect();
    assert!(ids.contains(&low.id));
    assert!(!ids.contains(&fine.id));
}

#[tokio::test]
async fn draft_bill_validation_rejects_bad_lines() {
    let app = setup().await;

    let err = app
        .services
        .bills
        .create_bill(NewBill {
            supplier_name: None,
            bill_date: None,
            total_amount: None,
            lines: vec![NewBillLine {
                item_id: None,
                item_name: "Ghost item".to_string(),
                quantity: dec!(0),
                unit: UnitOfMeasure::Kg,
                unit_price: dec!(1.00),
            }],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = app
        .services
        .bills
        .create_bill(NewBill {
            supplier_name: None,
            bill_date: None,
            total_amount: None,
            lines: vec![],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}
