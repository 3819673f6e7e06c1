//! Integration tests for the menu costing engine over seeded recipe and
//! menu data.

mod common;

use backhouse_api::{
    entities::menu::PricingMode,
    services::{
        dishes::{NewDish, NewRecipeLine},
        menus::{NewMenu, NewMenuDish, NewMenuSection},
    },
};
use common::{seed_item, setup, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Creates a dish whose cost is exactly `cost`: one ingredient at that
/// unit price, quantity one.
async fn dish_costing_exactly(
    app: &TestApp,
    name: &str,
    cost: Decimal,
    selling_price: Option<Decimal>,
) -> Uuid {
    let item = seed_item(app, &format!("{} base", name), dec!(100), Some(cost)).await;
    app.services
        .dishes
        .create_dish(NewDish {
            name: name.to_string(),
            description: None,
            selling_price,
            recipe: vec![NewRecipeLine {
                item_id: item,
                quantity: dec!(1),
                unit: "kg".to_string(),
            }],
        })
        .await
        .expect("failed to create dish")
        .dish
        .id
}

#[tokio::test]
async fn dish_cost_is_additive_over_recipe_lines() {
    let app = setup().await;
    let flour = seed_item(&app, "Flour", dec!(50), Some(dec!(0.80))).await;
    let butter = seed_item(&app, "Butter", dec!(10), Some(dec!(7.50))).await;

    let dish = app
        .services
        .dishes
        .create_dish(NewDish {
            name: "Brioche".to_string(),
            description: None,
            selling_price: Some(dec!(4.50)),
            recipe: vec![
                NewRecipeLine {
                    item_id: flour,
                    quantity: dec!(0.5),
                    unit: "kg".to_string(),
                },
                NewRecipeLine {
                    item_id: butter,
                    quantity: dec!(0.2),
                    unit: "kg".to_string(),
                },
            ],
        })
        .await
        .unwrap();

    let costing = app
        .services
        .menu_costing
        .dish_costing(dish.dish.id)
        .await
        .unwrap();

    // 0.5 × 0.80 + 0.2 × 7.50 = 1.90
    assert_eq!(costing.cost, Some(dec!(1.90)));
    assert_eq!(costing.ingredients.len(), 2);
    // (4.50 − 1.90) / 4.50 × 100 = 57.78
    assert_eq!(costing.margin_pct, Some(dec!(57.78)));
}

/// A dish whose ingredients carry no price reports a null cost, not a
/// misleading zero.
#[tokio::test]
async fn unpriced_dish_cost_is_not_computable() {
    let app = setup().await;
    let herbs = seed_item(&app, "Wild garlic", dec!(3), None).await;

    let dish = app
        .services
        .dishes
        .create_dish(NewDish {
            name: "Pesto".to_string(),
            description: None,
            selling_price: Some(dec!(6.00)),
            recipe: vec![NewRecipeLine {
                item_id: herbs,
                quantity: dec!(0.1),
                unit: "kg".to_string(),
            }],
        })
        .await
        .unwrap();

    let costing = app
        .services
        .menu_costing
        .dish_costing(dish.dish.id)
        .await
        .unwrap();
    assert_eq!(costing.cost, None);
    assert_eq!(costing.margin_pct, None);

    // No recipe at all: cost unknown as well.
    let empty = app
        .services
        .dishes
        .create_dish(NewDish {
            name: "Chef's surprise".to_string(),
            description: None,
            selling_price: None,
            recipe: vec![],
        })
        .await
        .unwrap();
    let costing = app
        .services
        .menu_costing
        .dish_costing(empty.dish.id)
        .await
        .unwrap();
    assert_eq!(costing.cost, None);
}

/// Worked example: dishes costing {4.00, 6.50} on a fixed-price menu at
/// 25.00 give a degenerate range and a 58% margin either way.
#[tokio::test]
async fn fixed_price_menu_costing_worked_example() {
    let app = setup().await;
    let starter = dish_costing_exactly(&app, "Terrine", dec!(4.00), Some(dec!(9.00))).await;
    let main = dish_costing_exactly(&app, "Duck breast", dec!(6.50), Some(dec!(19.00))).await;

    let menu = app
        .services
        .menus
        .create_menu(NewMenu {
            name: "Lunch menu".to_string(),
            pricing_mode: PricingMode::FixedPrice,
            fixed_price: Some(dec!(25.00)),
            min_courses: None,
            max_courses: None,
            sections: vec![
                NewMenuSection {
                    name: "Starter".to_string(),
                    is_required: true,
                    dishes: vec![NewMenuDish {
                        dish_id: starter,
                        price_override: None,
                        notes: None,
                    }],
                },
                NewMenuSection {
                    name: "Main".to_string(),
                    is_required: true,
                    dishes: vec![NewMenuDish {
                        dish_id: main,
                        price_override: None,
                        notes: None,
                    }],
                },
            ],
        })
        .await
        .unwrap();

    let costing = app
        .services
        .menu_costing
        .menu_costing(menu.menu.id)
        .await
        .unwrap();

    assert_eq!(costing.min_cost, dec!(10.50));
    assert_eq!(costing.max_cost, dec!(10.50));
    assert_eq!(costing.average_cost, dec!(5.25));
    assert_eq!(costing.dish_count, 2);
    assert_eq!(costing.worst_margin_pct, Some(dec!(58.00)));
    assert_eq!(costing.best_margin_pct, Some(dec!(58.00)));
    assert_eq!(costing.display_price.as_deref(), Some("25.00 €"));
}

/// Worked example: a required section costing {3, 5, 8} and an optional
/// one costing {2, 10} give min 3 and max 18.
#[tokio::test]
async fn choice_menu_costing_worked_example() {
    let app = setup().await;
    let d3 = dish_costing_exactly(&app, "Soup", dec!(3), None).await;
    let d5 = dish_costing_exactly(&app, "Tartare", dec!(5), None).await;
    let d8 = dish_costing_exactly(&app, "Lobster", dec!(8), None).await;
    let d2 = dish_costing_exactly(&app, "Sorbet", dec!(2), None).await;
    let d10 = dish_costing_exactly(&app, "Cheese cart", dec!(10), None).await;

    let menu = app
        .services
        .menus
        .create_menu(NewMenu {
            name: "Evening menu".to_string(),
            pricing_mode: PricingMode::Choice,
            fixed_price: Some(dec!(45.00)),
            min_courses: Some(2),
            max_courses: Some(3),
            sections: vec![
                NewMenuSection {
                    name: "Mains".to_string(),
                    is_required: true,
                    dishes: vec![d3, d5, d8]
                        .into_iter()
                        .map(|dish_id| NewMenuDish {
                            dish_id,
                            price_override: None,
                            notes: None,
                        })
                        .collect(),
                },
                NewMenuSection {
                    name: "Extras".to_string(),
                    is_required: false,
                    dishes: vec![d2, d10]
                        .into_iter()
                        .map(|dish_id| NewMenuDish {
                            dish_id,
                            price_override: None,
                            notes: None,
                        })
                        .collect(),
                },
            ],
        })
        .await
        .unwrap();

    let costing = app
        .services
        .menu_costing
        .menu_costing(menu.menu.id)
        .await
        .unwrap();

    assert_eq!(costing.min_cost, dec!(3));
    assert_eq!(costing.max_cost, dec!(18));
    // Mean of {3, 5, 8, 2, 10}.
    assert_eq!(costing.average_cost, dec!(5.60));
    assert_eq!(costing.dish_count, 5);
    // Course range differs, so the display price carries it.
    assert_eq!(
        costing.display_price.as_deref(),
        Some("45.00 € (2-3 courses)")
    );
    // Margin band against 45.00: worst (45−18)/45, best (45−3)/45.
    assert_eq!(costing.worst_margin_pct, Some(dec!(60.00)));
    assert_eq!(costing.best_margin_pct, Some(dec!(93.33)));
}

#[tokio::test]
async fn menu_without_fixed_price_reports_price_not_set() {
    let app = setup().await;
    let dish = dish_costing_exactly(&app, "Plat du jour", dec!(4), Some(dec!(12.00))).await;

    let menu = app
        .services
        .menus
        .create_menu(NewMenu {
            name: "Carte".to_string(),
            pricing_mode: PricingMode::ALaCarte,
            fixed_price: None,
            min_courses: None,
            max_courses: None,
            sections: vec![NewMenuSection {
                name: "Plats".to_string(),
                is_required: true,
                dishes: vec![NewMenuDish {
                    dish_id: dish,
                    price_override: Some(dec!(10.50)),
                    notes: None,
                }],
            }],
        })
        .await
        .unwrap();

    let costing = app
        .services
        .menu_costing
        .menu_costing(menu.menu.id)
        .await
        .unwrap();

    assert_eq!(costing.display_price, None);
    assert_eq!(costing.worst_margin_pct, None);
    assert_eq!(costing.best_margin_pct, None);

    // The menu-dish override supersedes the dish's own selling price.
    let entry = &costing.sections[0].dishes[0];
    assert_eq!(entry.effective_price, Some(dec!(10.50)));
}

/// Recomputing from the same underlying data yields identical results:
/// the engine is a pure function of its snapshot.
#[tokio::test]
async fn menu_costing_is_idempotent() {
    let app = setup().await;
    let d1 = dish_costing_exactly(&app, "Gnocchi", dec!(2.40), Some(dec!(9.00))).await;
    let d2 = dish_costing_exactly(&app, "Osso buco", dec!(7.10), Some(dec!(21.00))).await;

    let menu = app
        .services
        .menus
        .create_menu(NewMenu {
            name: "Menu del giorno".to_string(),
            pricing_mode: PricingMode::FixedPrice,
            fixed_price: Some(dec!(28.00)),
            min_courses: None,
            max_courses: None,
            sections: vec![NewMenuSection {
                name: "Tutti".to_string(),
                is_required: true,
                dishes: vec![d1, d2]
                    .into_iter()
                    .map(|dish_id| NewMenuDish {
                        dish_id,
                        price_override: None,
                        notes: None,
                    })
                    .collect(),
            }],
        })
        .await
        .unwrap();

    let first = app
        .services
        .menu_costing
        .menu_costing(menu.menu.id)
        .await
        .unwrap();
    let second = app
        .services
        .menu_costing
        .menu_costing(menu.menu.id)
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

/// Costing never mutates: reading a menu's costs leaves item quantities
/// and prices untouched.
#[tokio::test]
async fn costing_is_read_only() {
    let app = setup().await;
    let item = seed_item(&app, "Beef cheek", dec!(12), Some(dec!(9.00))).await;
    let dish = app
        .services
        .dishes
        .create_dish(NewDish {
            name: "Daube".to_string(),
            description: None,
            selling_price: Some(dec!(17.00)),
            recipe: vec![NewRecipeLine {
                item_id: item,
                quantity: dec!(0.3),
                unit: "kg".to_string(),
            }],
        })
        .await
        .unwrap();

    let before = app.services.items.get_item(item).await.unwrap();
    app.services
        .menu_costing
        .dish_costing(dish.dish.id)
        .await
        .unwrap();
    let after = app.services.items.get_item(item).await.unwrap();

    assert_eq!(before.quantity, after.quantity);
    assert_eq!(before.unit_price, after.unit_price);
    assert_eq!(before.total_value, after.total_value);
}
