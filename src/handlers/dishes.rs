use crate::{
    errors::ApiError,
    handlers::common::{
        created_response, no_content_response, success_response, validate_input,
        PaginatedResponse, PaginationParams,
    },
    services::dishes::{DishUpdate, NewDish, NewRecipeLine},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecipeLineRequest {
    pub item_id: Uuid,
    pub quantity: Decimal,
    #[schema(example = "g")]
    pub unit: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDishRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub selling_price: Option<Decimal>,
    #[serde(default)]
    #[validate]
    pub recipe: Vec<RecipeLineRequest>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateDishRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub selling_price: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReplaceRecipeRequest {
    #[validate]
    pub recipe: Vec<RecipeLineRequest>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_dishes).post(create_dish))
        .route("/:id", get(get_dish).put(update_dish).delete(delete_dish))
        .route("/:id/recipe", put(replace_recipe))
        .route("/:id/costing", get(dish_costing))
}

fn to_recipe_lines(lines: Vec<RecipeLineRequest>) -> Vec<NewRecipeLine> {
    lines
        .into_iter()
        .map(|l| NewRecipeLine {
            item_id: l.item_id,
            quantity: l.quantity,
            unit: l.unit,
        })
        .collect()
}

/// Create a dish with its recipe.
#[utoipa::path(
    post,
    path = "/api/v1/dishes",
    request_body = CreateDishRequest,
    responses(
        (status = 201, description = "Dish created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Recipe item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dishes"
)]
pub async fn create_dish(
    State(state): State<AppState>,
    Json(payload): Json<CreateDishRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .services
        .dishes
        .create_dish(NewDish {
            name: payload.name,
            description: payload.description,
            selling_price: payload.selling_price,
            recipe: to_recipe_lines(payload.recipe),
        })
        .await?;

    Ok(created_response(serde_json::json!({
        "dish": created.dish,
        "recipe": created.recipe,
    })))
}

/// Fetch a dish with its recipe lines.
#[utoipa::path(
    get,
    path = "/api/v1/dishes/{id}",
    params(("id" = Uuid, Path, description = "Dish id")),
    responses(
        (status = 200, description = "Dish returned"),
        (status = 404, description = "Dish not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dishes"
)]
pub async fn get_dish(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let found = state.services.dishes.get_dish(id).await?;
    Ok(success_response(serde_json::json!({
        "dish": found.dish,
        "recipe": found.recipe,
    })))
}

/// List active dishes.
#[utoipa::path(
    get,
    path = "/api/v1/dishes",
    params(PaginationParams),
    responses(
        (status = 200, description = "Dish list returned")
    ),
    tag = "dishes"
)]
pub async fn list_dishes(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (dishes, total) = state
        .services
        .dishes
        .list_dishes(pagination.page, pagination.per_page)
        .await?;

    Ok(success_response(PaginatedResponse::new(
        dishes,
        &pagination,
        total,
    )))
}

/// Update a dish's metadata.
#[utoipa::path(
    put,
    path = "/api/v1/dishes/{id}",
    params(("id" = Uuid, Path, description = "Dish id")),
    request_body = UpdateDishRequest,
    responses(
        (status = 200, description = "Dish updated"),
        (status = 404, description = "Dish not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dishes"
)]
pub async fn update_dish(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDishRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .dishes
        .update_dish(
            id,
            DishUpdate {
                name: payload.name,
                description: payload.description.map(Some),
                selling_price: payload.selling_price.map(Some),
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(success_response(updated))
}

/// Replace a dish's recipe wholesale.
#[utoipa::path(
    put,
    path = "/api/v1/dishes/{id}/recipe",
    params(("id" = Uuid, Path, description = "Dish id")),
    request_body = ReplaceRecipeRequest,
    responses(
        (status = 200, description = "Recipe replaced"),
        (status = 404, description = "Dish or item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dishes"
)]
pub async fn replace_recipe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplaceRecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let recipe = state
        .services
        .dishes
        .replace_recipe(id, to_recipe_lines(payload.recipe))
        .await?;

    Ok(success_response(recipe))
}

/// Soft-delete a dish.
#[utoipa::path(
    delete,
    path = "/api/v1/dishes/{id}",
    params(("id" = Uuid, Path, description = "Dish id")),
    responses(
        (status = 204, description = "Dish deleted"),
        (status = 404, description = "Dish not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dishes"
)]
pub async fn delete_dish(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.dishes.delete_dish(id).await?;
    Ok(no_content_response())
}

/// Cost and margin for a dish from its recipe and current ingredient
/// prices. A dish whose ingredients carry no price reports a null cost
/// ("not computable"), never a misleading zero.
#[utoipa::path(
    get,
    path = "/api/v1/dishes/{id}/costing",
    params(("id" = Uuid, Path, description = "Dish id")),
    responses(
        (status = 200, description = "Dish costing returned", body = crate::services::menu_costing::DishCosting),
        (status = 404, description = "Dish not found", body = crate::errors::ErrorResponse)
    ),
    tag = "dishes"
)]
pub async fn dish_costing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let costing = state.services.menu_costing.dish_costing(id).await?;
    Ok(success_response(costing))
}
