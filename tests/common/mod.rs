//! Shared test harness: an isolated in-memory SQLite database with
//! migrations applied, plus the full service container.

use backhouse_api::{
    db::DbPool,
    entities::item::UnitOfMeasure,
    events::EventSender,
    services::items::NewItem,
    AppServices,
};
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
}

/// Builds a fresh in-memory database per test. A single pooled connection
/// keeps the in-memory database alive and isolated from other tests.
pub async fn setup() -> TestApp {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt)
        .await
        .expect("failed to open in-memory database");
    backhouse_api::db::run_migrations(&db)
        .await
        .expect("failed to run migrations");

    let db = Arc::new(db);

    // Drain events so senders never block on a full channel.
    let (tx, mut rx) = mpsc::channel(256);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let services = AppServices::new(db.clone(), Arc::new(EventSender::new(tx)));

    TestApp { db, services }
}

/// Creates a trackable item with an opening quantity and price.
pub async fn seed_item(
    app: &TestApp,
    name: &str,
    opening_quantity: Decimal,
    unit_price: Option<Decimal>,
) -> Uuid {
    app.services
        .items
        .create_item(NewItem {
            name: name.to_string(),
            unit: UnitOfMeasure::Kg,
            unit_price,
            track_stock: true,
            par_level: None,
            category: None,
            opening_quantity: Some(opening_quantity),
        })
        .await
        .expect("failed to seed item")
        .id
}
