use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::entities::category;
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::services::catalog::CategoryWithCount;
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, patch, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for category endpoints
pub fn categories_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_category))
        .route("/:category_id", put(update_category))
        .route("/:category_id", patch(update_category))
        .route("/:category_id", delete(delete_category))
        .with_permission(perm::CATALOG_MANAGE);

    Router::new()
        .route("/", get(list_categories))
        .route("/:category_id", get(get_category))
        .merge(protected)
}

/// List all categories with their product counts
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses(
        (status = 200, description = "Categories retrieved", body = [CategoryResponse])
    ),
    tag = "Categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let categories = state
        .services
        .catalog
        .list_categories()
        .await
        .map_err(map_service_error)?;

    let data: Vec<CategoryResponse> = categories.into_iter().map(CategoryResponse::from).collect();
    Ok(success_response(data))
}

/// Get a category by ID
#[utoipa::path(
    get,
    path = "/api/v1/categories/:category_id",
    params(("category_id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category retrieved", body = CategoryResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let category = state
        .services
        .catalog
        .get_category(category_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CategoryResponse::from(category)))
}

/// Create a category (staff only)
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let category = state
        .services
        .catalog
        .create_category(payload.name.trim().to_string())
        .await
        .map_err(map_service_error)?;

    Ok(created_response(CategoryResponse::from(category)))
}

/// Rename a category (staff only)
#[utoipa::path(
    put,
    path = "/api/v1/categories/:category_id",
    params(("category_id" = Uuid, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let category = state
        .services
        .catalog
        .update_category(category_id, payload.name.trim().to_string())
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CategoryResponse::from(category)))
}

/// Delete a category (staff only)
#[utoipa::path(
    delete,
    path = "/api/v1/categories/:category_id",
    params(("category_id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_category(category_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

// Request/response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryRequest {
    #[validate(length(min = 1))]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    /// Populated by the list endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_count: Option<i64>,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            product_count: None,
        }
    }
}

impl From<CategoryWithCount> for CategoryResponse {
    fn from(row: CategoryWithCount) -> Self {
        Self {
            id: row.id,
            name: row.name,
            product_count: Some(row.product_count),
        }
    }
}
