use crate::{
    entities::{item::UnitOfMeasure, supplier_bill::BillStatus},
    errors::ApiError,
    handlers::common::{
        created_response, success_response, validate_input, PaginatedResponse, PaginationParams,
    },
    services::{
        bills::{NewBill, NewBillLine},
        stock_ledger::BillMetadata,
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BillLineRequest {
    /// Existing item to receive into; absent to create a new item.
    pub item_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub item_name: String,
    pub quantity: Decimal,
    #[schema(example = "kg")]
    pub unit: String,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBillRequest {
    pub supplier_name: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub total_amount: Option<Decimal>,
    #[validate]
    pub lines: Vec<BillLineRequest>,
}

/// Metadata stamped onto the bill when it is confirmed.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ConfirmBillRequest {
    pub supplier_name: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub total_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BillFilters {
    /// "draft" or "confirmed"
    pub status: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bills).post(create_bill))
        .route("/:id", get(get_bill))
        .route("/:id/confirm", post(confirm_bill))
}

/// Create a draft bill from parsed lines.
#[utoipa::path(
    post,
    path = "/api/v1/bills",
    request_body = CreateBillRequest,
    responses(
        (status = 201, description = "Draft bill created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "bills"
)]
pub async fn create_bill(
    State(state): State<AppState>,
    Json(payload): Json<CreateBillRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let mut lines = Vec::with_capacity(payload.lines.len());
    for line in payload.lines {
        let unit = UnitOfMeasure::from_str(&line.unit).ok_or_else(|| {
            ApiError::BadRequest(format!("Unknown unit of measure '{}'", line.unit))
        })?;
        lines.push(NewBillLine {
            item_id: line.item_id,
            item_name: line.item_name,
            quantity: line.quantity,
            unit,
            unit_price: line.unit_price,
        });
    }

    let created = state
        .services
        .bills
        .create_bill(NewBill {
            supplier_name: payload.supplier_name,
            bill_date: payload.bill_date,
            total_amount: payload.total_amount,
            lines,
        })
        .await?;

    Ok(created_response(serde_json::json!({
        "bill": created.bill,
        "lines": created.lines,
    })))
}

/// Fetch a bill with its lines.
#[utoipa::path(
    get,
    path = "/api/v1/bills/{id}",
    params(("id" = Uuid, Path, description = "Bill id")),
    responses(
        (status = 200, description = "Bill returned"),
        (status = 404, description = "Bill not found", body = crate::errors::ErrorResponse)
    ),
    tag = "bills"
)]
pub async fn get_bill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let found = state.services.bills.get_bill(id).await?;
    Ok(success_response(serde_json::json!({
        "bill": found.bill,
        "lines": found.lines,
    })))
}

/// List bills, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/api/v1/bills",
    params(BillFilters, PaginationParams),
    responses(
        (status = 200, description = "Bill list returned"),
        (status = 400, description = "Invalid status filter", body = crate::errors::ErrorResponse)
    ),
    tag = "bills"
)]
pub async fn list_bills(
    State(state): State<AppState>,
    Query(filters): Query<BillFilters>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let status = filters
        .status
        .as_deref()
        .map(|s| {
            BillStatus::from_str(s)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown bill status '{}'", s)))
        })
        .transpose()?;

    let (bills, total) = state
        .services
        .bills
        .list_bills(status, pagination.page, pagination.per_page)
        .await?;

    Ok(success_response(PaginatedResponse::new(
        bills,
        &pagination,
        total,
    )))
}

/// Confirm a draft bill: applies every line to stock atomically and
/// stamps supplier/date/total metadata.
#[utoipa::path(
    post,
    path = "/api/v1/bills/{id}/confirm",
    params(("id" = Uuid, Path, description = "Bill id")),
    request_body = ConfirmBillRequest,
    responses(
        (status = 200, description = "Bill confirmed, movements recorded"),
        (status = 404, description = "Bill not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Bill already confirmed", body = crate::errors::ErrorResponse)
    ),
    tag = "bills"
)]
pub async fn confirm_bill(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ConfirmBillRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let metadata = payload.map(|Json(p)| p).unwrap_or_default();

    let results = state
        .services
        .stock_ledger
        .confirm_bill(
            id,
            BillMetadata {
                supplier_name: metadata.supplier_name,
                bill_date: metadata.bill_date,
                total_amount: metadata.total_amount,
            },
        )
        .await?;

    let movements: Vec<serde_json::Value> = results
        .iter()
        .map(|r| {
            serde_json::json!({
                "movement_id": r.movement_id,
                "item_id": r.item_id,
                "kind": r.kind.as_str(),
                "quantity": r.quantity,
                "balance_after": r.balance_after,
                "total_value": r.total_value,
                "item_created": r.item_created,
            })
        })
        .collect();

    Ok(success_response(
        serde_json::json!({ "movements": movements }),
    ))
}
