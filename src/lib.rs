//! Restaurant back-office core service.
//!
//! Two components do the real work: the stock ledger
//! ([`services::stock_ledger`]), which applies deliveries, dispute
//! resolutions and sales as atomic, auditable movements over inventory
//! items, and the menu costing engine ([`services::menu_costing`]), which
//! derives cost, price and margin figures from the recipe graph and menu
//! structure. Everything else is the surface around them: axum handlers,
//! sea-orm entities, configuration and an in-process event channel.

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::Router;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::db::DbPool;
use crate::events::EventSender;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub items: Arc<services::items::ItemService>,
    pub dishes: Arc<services::dishes::DishService>,
    pub menus: Arc<services::menus::MenuService>,
    pub bills: Arc<services::bills::BillService>,
    pub disputes: Arc<services::disputes::DisputeService>,
    pub stock_ledger: Arc<services::stock_ledger::StockLedgerService>,
    pub menu_costing: Arc<services::menu_costing::MenuCostingService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            items: Arc::new(services::items::ItemService::new(
                db.clone(),
                event_sender.clone(),
            )),
            dishes: Arc::new(services::dishes::DishService::new(
                db.clone(),
                event_sender.clone(),
            )),
            menus: Arc::new(services::menus::MenuService::new(
                db.clone(),
                event_sender.clone(),
            )),
            bills: Arc::new(services::bills::BillService::new(
                db.clone(),
                event_sender.clone(),
            )),
            disputes: Arc::new(services::disputes::DisputeService::new(
                db.clone(),
                event_sender.clone(),
            )),
            stock_ledger: Arc::new(services::stock_ledger::StockLedgerService::new(
                db.clone(),
                event_sender.clone(),
            )),
            menu_costing: Arc::new(services::menu_costing::MenuCostingService::new(db)),
        }
    }
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: EventSender,
    pub services: AppServices,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::items::list_items,
        handlers::items::create_item,
        handlers::items::get_item,
        handlers::items::update_item,
        handlers::items::delete_item,
        handlers::items::movement_history,
        handlers::items::low_stock_items,
        handlers::dishes::list_dishes,
        handlers::dishes::create_dish,
        handlers::dishes::get_dish,
        handlers::dishes::update_dish,
        handlers::dishes::replace_recipe,
        handlers::dishes::delete_dish,
        handlers::dishes::dish_costing,
        handlers::menus::list_menus,
        handlers::menus::create_menu,
        handlers::menus::get_menu,
        handlers::menus::update_menu,
        handlers::menus::delete_menu,
        handlers::menus::menu_costing,
        handlers::bills::list_bills,
        handlers::bills::create_bill,
        handlers::bills::get_bill,
        handlers::bills::confirm_bill,
        handlers::disputes::list_disputes,
        handlers::disputes::open_dispute,
        handlers::disputes::get_dispute,
        handlers::disputes::resolve_dispute,
        handlers::sales::record_sale,
    ),
    components(schemas(
        errors::ErrorResponse,
        handlers::items::CreateItemRequest,
        handlers::items::UpdateItemRequest,
        handlers::dishes::CreateDishRequest,
        handlers::dishes::UpdateDishRequest,
        handlers::dishes::RecipeLineRequest,
        handlers::dishes::ReplaceRecipeRequest,
        handlers::menus::CreateMenuRequest,
        handlers::menus::UpdateMenuRequest,
        handlers::menus::MenuSectionRequest,
        handlers::menus::MenuDishRequest,
        handlers::bills::CreateBillRequest,
        handlers::bills::BillLineRequest,
        handlers::bills::ConfirmBillRequest,
        handlers::disputes::OpenDisputeRequest,
        handlers::sales::RecordSaleRequest,
        services::menu_costing::DishCosting,
        services::menu_costing::MenuCosting,
        services::menu_costing::SectionCosting,
        services::menu_costing::MenuDishCosting,
        services::menu_costing::IngredientCost,
    )),
    tags(
        (name = "items", description = "Inventory items and movement history"),
        (name = "bills", description = "Supplier bills and confirmation into stock"),
        (name = "disputes", description = "Supplier disputes and resolutions"),
        (name = "sales", description = "Sale recording against recipes"),
        (name = "dishes", description = "Dishes and recipes"),
        (name = "menus", description = "Menus, sections and costing")
    )
)]
pub struct ApiDoc;

/// Versioned API routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/items", handlers::items::router())
        .nest("/dishes", handlers::dishes::router())
        .nest("/menus", handlers::menus::router())
        .nest("/bills", handlers::bills::router())
        .nest("/disputes", handlers::disputes::router())
        .nest("/sales", handlers::sales::router())
}

/// Full application router with middleware and API docs.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::health::router())
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
}
