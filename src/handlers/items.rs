use crate::{
    entities::item::UnitOfMeasure,
    errors::ApiError,
    handlers::common::{
        created_response, no_content_response, success_response, validate_input,
        PaginatedResponse, PaginationParams,
    },
    services::items::{ItemUpdate, NewItem},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Unit of measure: kg, g, l, ml, cl, piece, bunch or dozen.
    #[schema(example = "kg")]
    pub unit: String,
    pub unit_price: Option<Decimal>,
    #[serde(default = "default_track_stock")]
    pub track_stock: bool,
    pub par_level: Option<Decimal>,
    pub category: Option<String>,
    /// Opening stock, recorded as an `initial` movement when positive.
    pub opening_quantity: Option<Decimal>,
}

fn default_track_stock() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub unit: Option<String>,
    pub par_level: Option<Decimal>,
    pub category: Option<String>,
    pub track_stock: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ItemFilters {
    pub category: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/low-stock", get(low_stock_items))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
        .route("/:id/movements", get(movement_history))
}

fn parse_unit(unit: &str) -> Result<UnitOfMeasure, ApiError> {
    UnitOfMeasure::from_str(unit)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown unit of measure '{}'", unit)))
}

/// List active items, optionally narrowed by category.
#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(ItemFilters, PaginationParams),
    responses(
        (status = 200, description = "Item list returned"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(filters): Query<ItemFilters>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (items, total) = state
        .services
        .items
        .list_items(filters.category, pagination.page, pagination.per_page)
        .await?;

    Ok(success_response(PaginatedResponse::new(
        items,
        &pagination,
        total,
    )))
}

/// Create an inventory item.
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let unit = parse_unit(&payload.unit)?;

    let created = state
        .services
        .items
        .create_item(NewItem {
            name: payload.name,
            unit,
            unit_price: payload.unit_price,
            track_stock: payload.track_stock,
            par_level: payload.par_level,
            category: payload.category,
            opening_quantity: payload.opening_quantity,
        })
        .await?;

    Ok(created_response(created))
}

/// Fetch one item with its current quantity, unit price and total value.
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item returned"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.services.items.get_item(id).await?;
    Ok(success_response(item))
}

/// Update item metadata. Quantity, price and value only change through
/// ledger movements.
#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let unit = payload.unit.as_deref().map(parse_unit).transpose()?;

    let updated = state
        .services
        .items
        .update_item(
            id,
            ItemUpdate {
                name: payload.name,
                unit,
                par_level: payload.par_level.map(Some),
                category: payload.category.map(Some),
                track_stock: payload.track_stock,
            },
        )
        .await?;

    Ok(success_response(updated))
}

/// Soft-delete an item.
#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.items.delete_item(id).await?;
    Ok(no_content_response())
}

/// Movement history for an item, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}/movements",
    params(("id" = Uuid, Path, description = "Item id"), PaginationParams),
    responses(
        (status = 200, description = "Movement history returned"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn movement_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (movements, total) = state
        .services
        .stock_ledger
        .movement_history(id, pagination.page, pagination.per_page)
        .await?;

    Ok(success_response(PaginatedResponse::new(
        movements,
        &pagination,
        total,
    )))
}

/// Items at or below their par level.
#[utoipa::path(
    get,
    path = "/api/v1/items/low-stock",
    responses(
        (status = 200, description = "Low-stock items returned")
    ),
    tag = "items"
)]
pub async fn low_stock_items(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.services.stock_ledger.low_stock_items().await?;
    Ok(success_response(items))
}
