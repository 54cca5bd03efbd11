use crate::auth::{AuthRouterExt, AuthenticatedUser};
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::handlers::products::ProductResponse;
use crate::{errors::ApiError, services::wishlist::WishlistEntry, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for wishlist endpoints. Entries are always scoped to
/// the calling user.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_wishlist))
        .route("/", post(add_to_wishlist))
        .route("/:entry_id", get(get_wishlist_entry))
        .route("/:entry_id", delete(remove_from_wishlist))
        .with_auth()
}

/// List the caller's wishlist entries
#[utoipa::path(
    get,
    path = "/api/v1/wishlist",
    responses(
        (status = 200, description = "Wishlist retrieved", body = [WishlistEntryResponse]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Wishlist"
)]
pub async fn list_wishlist(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let entries = state
        .services
        .wishlist
        .list(&user)
        .await
        .map_err(map_service_error)?;

    let data: Vec<WishlistEntryResponse> = entries
        .into_iter()
        .map(WishlistEntryResponse::from)
        .collect();
    Ok(success_response(data))
}

/// Add a product to the caller's wishlist
#[utoipa::path(
    post,
    path = "/api/v1/wishlist",
    request_body = AddWishlistRequest,
    responses(
        (status = 201, description = "Entry added", body = WishlistEntryResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already on the wishlist", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Wishlist"
)]
pub async fn add_to_wishlist(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<AddWishlistRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let entry = state
        .services
        .wishlist
        .add(&user, payload.product_id)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(WishlistEntryResponse::from(entry)))
}

/// Get a wishlist entry
#[utoipa::path(
    get,
    path = "/api/v1/wishlist/:entry_id",
    params(("entry_id" = Uuid, Path, description = "Wishlist entry ID")),
    responses(
        (status = 200, description = "Entry retrieved", body = WishlistEntryResponse),
        (status = 404, description = "Entry not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Wishlist"
)]
pub async fn get_wishlist_entry(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let entry = state
        .services
        .wishlist
        .get(&user, entry_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(WishlistEntryResponse::from(entry)))
}

/// Remove a wishlist entry
#[utoipa::path(
    delete,
    path = "/api/v1/wishlist/:entry_id",
    params(("entry_id" = Uuid, Path, description = "Wishlist entry ID")),
    responses(
        (status = 204, description = "Entry removed"),
        (status = 404, description = "Entry not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Wishlist"
)]
pub async fn remove_from_wishlist(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .wishlist
        .remove(&user, entry_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

// Request/response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddWishlistRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistEntryResponse {
    pub id: Uuid,
    pub product: ProductResponse,
    pub created_at: DateTime<Utc>,
}

impl From<WishlistEntry> for WishlistEntryResponse {
    fn from(entry: WishlistEntry) -> Self {
        Self {
            id: entry.item.id,
            product: ProductResponse::from(entry.product),
            created_at: entry.item.created_at,
        }
    }
}
