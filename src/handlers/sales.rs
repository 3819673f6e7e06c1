use crate::{errors::ApiError, handlers::common::success_response, AppState};
use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordSaleRequest {
    pub dish_id: Uuid,
    pub quantity: Decimal,
    /// Reference of the sale in the till; generated when absent.
    pub sale_id: Option<Uuid>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(record_sale))
}

/// Record the sale of a dish: deducts every ingredient of its recipe from
/// stock in one atomic transaction.
#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = RecordSaleRequest,
    responses(
        (status = 200, description = "Sale recorded, stock deducted"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Dish or ingredient not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn record_sale(
    State(state): State<AppState>,
    Json(payload): Json<RecordSaleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sale_id = payload.sale_id.unwrap_or_else(Uuid::new_v4);

    let results = state
        .services
        .stock_ledger
        .record_sale(payload.dish_id, payload.quantity, sale_id)
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
            })
        })
        .collect();

    Ok(success_response(serde_json::json!({
        "sale_id": sale_id,
        "movements": movements,
    })))
}
