use crate::{
    entities::dispute::DisputeStatus,
    errors::ApiError,
    handlers::common::{
        created_response, success_response, validate_input, PaginatedResponse, PaginationParams,
    },
    services::disputes::NewDispute,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OpenDisputeRequest {
    pub bill_id: Option<Uuid>,
    pub item_id: Uuid,
    /// Signed quantity change applied to stock when the dispute resolves
    /// (negative for shortages/returns to the supplier).
    pub quantity_delta: Decimal,
    #[validate(length(min = 1, max = 1024))]
    pub reason: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DisputeFilters {
    /// "open" or "resolved"
    pub status: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_disputes).post(open_dispute))
        .route("/:id", get(get_dispute))
        .route("/:id/resolve", post(resolve_dispute))
}

/// Open a dispute against an item (optionally tied to a bill).
#[utoipa::path(
    post,
    path = "/api/v1/disputes",
    request_body = OpenDisputeRequest,
    responses(
        (status = 201, description = "Dispute opened"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item or bill not found", body = crate::errors::ErrorResponse)
    ),
    tag = "disputes"
)]
pub async fn open_dispute(
    State(state): State<AppState>,
    Json(payload): Json<OpenDisputeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .services
        .disputes
        .open_dispute(NewDispute {
            bill_id: payload.bill_id,
            item_id: payload.item_id,
            quantity_delta: payload.quantity_delta,
            reason: payload.reason,
        })
        .await?;

    Ok(created_response(created))
}

/// Fetch one dispute.
#[utoipa::path(
    get,
    path = "/api/v1/disputes/{id}",
    params(("id" = Uuid, Path, description = "Dispute id")),
    responses(
        (status = 200, description = "Dispute returned"),
        (status = 404, description = "Dispute not found", body = crate::errors::ErrorResponse)
    ),
    tag = "disputes"
)]
pub async fn get_dispute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let found = state.services.disputes.get_dispute(id).await?;
    Ok(success_response(found))
}

/// List disputes, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/api/v1/disputes",
    params(DisputeFilters, PaginationParams),
    responses(
        (status = 200, description = "Dispute list returned"),
        (status = 400, description = "Invalid status filter", body = crate::errors::ErrorResponse)
    ),
    tag = "disputes"
)]
pub async fn list_disputes(
    State(state): State<AppState>,
    Query(filters): Query<DisputeFilters>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let status = filters
        .status
        .as_deref()
        .map(|s| {
            DisputeStatus::from_str(s)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown dispute status '{}'", s)))
        })
        .transpose()?;

    let (disputes, total) = state
        .services
        .disputes
        .list_disputes(status, pagination.page, pagination.per_page)
        .await?;

    Ok(success_response(PaginatedResponse::new(
        disputes,
        &pagination,
        total,
    )))
}

/// Resolve an open dispute: applies its quantity delta to stock as an
/// adjustment movement and flips the status, atomically.
#[utoipa::path(
    post,
    path = "/api/v1/disputes/{id}/resolve",
    params(("id" = Uuid, Path, description = "Dispute id")),
    responses(
        (status = 200, description = "Dispute resolved, adjustment recorded"),
        (status = 404, description = "Dispute not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Dispute already resolved", body = crate::errors::ErrorResponse)
    ),
    tag = "disputes"
)]
pub async fn resolve_dispute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.services.stock_ledger.resolve_dispute(id).await?;

    Ok(success_response(serde_json::json!({
        "movement_id": result.movement_id,
        "item_id": result.item_id,
        "kind": result.kind.as_str(),
        "quantity": result.quantity,
        "balance_after": result.balance_after,
        "total_value": result.total_value,
    })))
}
