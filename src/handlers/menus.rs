use crate::{
    entities::menu::PricingMode,
    errors::ApiError,
    handlers::common::{
        created_response, no_content_response, success_response, validate_input,
        PaginatedResponse, PaginationParams,
    },
    services::menus::{MenuUpdate, NewMenu, NewMenuDish, NewMenuSection},
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
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema)]
pub struct MenuDishRequest {
    pub dish_id: Uuid,
    /// Supersedes the dish's own selling price within this menu.
    pub price_override: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MenuSectionRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default = "default_is_required")]
    pub is_required: bool,
    #[serde(default)]
    pub dishes: Vec<MenuDishRequest>,
}

fn default_is_required() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMenuRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// "a_la_carte", "fixed_price" or "choice"
    #[schema(example = "fixed_price")]
    pub pricing_mode: String,
    pub fixed_price: Option<Decimal>,
    pub min_courses: Option<i32>,
    pub max_courses: Option<i32>,
    #[serde(default)]
    #[validate]
    pub sections: Vec<MenuSectionRequest>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMenuRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub fixed_price: Option<Decimal>,
    pub min_courses: Option<i32>,
    pub max_courses: Option<i32>,
    pub is_active: Option<bool>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_menus).post(create_menu))
        .route("/:id", get(get_menu).put(update_menu).delete(delete_menu))
        .route("/:id/costing", get(menu_costing))
}

fn menu_tree_json(tree: &crate::services::menus::MenuTree) -> serde_json::Value {
    serde_json::json!({
        "menu": tree.menu,
        "sections": tree
            .sections
            .iter()
            .map(|(section, dishes)| serde_json::json!({
                "section": section,
                "dishes": dishes,
            }))
            .collect::<Vec<_>>(),
    })
}

/// Create a menu with its sections and dish entries.
#[utoipa::path(
    post,
    path = "/api/v1/menus",
    request_body = CreateMenuRequest,
    responses(
        (status = 201, description = "Menu created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Dish not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menus"
)]
pub async fn create_menu(
    State(state): State<AppState>,
    Json(payload): Json<CreateMenuRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let pricing_mode = PricingMode::from_str(&payload.pricing_mode).ok_or_else(|| {
        ApiError::BadRequest(format!("Unknown pricing mode '{}'", payload.pricing_mode))
    })?;

    let sections = payload
        .sections
        .into_iter()
        .map(|s| NewMenuSection {
            name: s.name,
            is_required: s.is_required,
            dishes: s
                .dishes
                .into_iter()
                .map(|d| NewMenuDish {
                    dish_id: d.dish_id,
                    price_override: d.price_override,
                    notes: d.notes,
                })
                .collect(),
        })
        .collect();

    let tree = state
        .services
        .menus
        .create_menu(NewMenu {
            name: payload.name,
            pricing_mode,
            fixed_price: payload.fixed_price,
            min_courses: payload.min_courses,
            max_courses: payload.max_courses,
            sections,
        })
        .await?;

    Ok(created_response(menu_tree_json(&tree)))
}

/// Fetch a menu with its full section/dish tree.
#[utoipa::path(
    get,
    path = "/api/v1/menus/{id}",
    params(("id" = Uuid, Path, description = "Menu id")),
    responses(
        (status = 200, description = "Menu returned"),
        (status = 404, description = "Menu not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menus"
)]
pub async fn get_menu(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tree = state.services.menus.get_menu(id).await?;
    Ok(success_response(menu_tree_json(&tree)))
}

/// List active menus.
#[utoipa::path(
    get,
    path = "/api/v1/menus",
    params(PaginationParams),
    responses(
        (status = 200, description = "Menu list returned")
    ),
    tag = "menus"
)]
pub async fn list_menus(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (menus, total) = state
        .services
        .menus
        .list_menus(pagination.page, pagination.per_page)
        .await?;

    Ok(success_response(PaginatedResponse::new(
        menus,
        &pagination,
        total,
    )))
}

/// Update menu metadata.
#[utoipa::path(
    put,
    path = "/api/v1/menus/{id}",
    params(("id" = Uuid, Path, description = "Menu id")),
    request_body = UpdateMenuRequest,
    responses(
        (status = 200, description = "Menu updated"),
        (status = 404, description = "Menu not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menus"
)]
pub async fn update_menu(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMenuRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .menus
        .update_menu(
            id,
            MenuUpdate {
                name: payload.name,
                fixed_price: payload.fixed_price.map(Some),
                min_courses: payload.min_courses.map(Some),
                max_courses: payload.max_courses.map(Some),
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(success_response(updated))
}

/// Soft-delete a menu.
#[utoipa::path(
    delete,
    path = "/api/v1/menus/{id}",
    params(("id" = Uuid, Path, description = "Menu id")),
    responses(
        (status = 204, description = "Menu deleted"),
        (status = 404, description = "Menu not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menus"
)]
pub async fn delete_menu(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.menus.delete_menu(id).await?;
    Ok(no_content_response())
}

/// Cost range, margin band and display price for a menu.
#[utoipa::path(
    get,
    path = "/api/v1/menus/{id}/costing",
    params(("id" = Uuid, Path, description = "Menu id")),
    responses(
        (status = 200, description = "Menu costing returned", body = crate::services::menu_costing::MenuCosting),
        (status = 404, description = "Menu not found", body = crate::errors::ErrorResponse)
    ),
    tag = "menus"
)]
pub async fn menu_costing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let costing = state.services.menu_costing.menu_costing(id).await?;
    Ok(success_response(costing))
}
