use crate::auth::{AuthRouterExt, AuthenticatedUser};
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::handlers::products::ProductResponse;
use crate::{
    errors::ApiError,
    services::carts::{AddToCartInput, CartLine, CartWithItems},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, patch, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for cart endpoints. Carts are owner-scoped; the item
/// routes take the owning cart from the URL path, never from the payload.
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_carts))
        .route("/", post(create_cart))
        .route("/:cart_id", get(get_cart))
        .route("/:cart_id", delete(delete_cart))
        .route("/:cart_id/items", get(list_cart_items))
        .route("/:cart_id/items", post(add_cart_item))
        .route("/:cart_id/items/:item_id", get(get_cart_item))
        .route("/:cart_id/items/:item_id", put(update_cart_item))
        .route("/:cart_id/items/:item_id", patch(update_cart_item))
        .route("/:cart_id/items/:item_id", delete(remove_cart_item))
        .with_auth()
}

/// List the caller's carts
#[utoipa::path(
    get,
    path = "/api/v1/carts",
    responses(
        (status = 200, description = "Carts retrieved", body = [CartResponse]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Carts"
)]
pub async fn list_carts(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let carts = state
        .services
        .carts
        .list_carts(&user)
        .await
        .map_err(map_service_error)?;

    let data: Vec<CartResponse> = carts.into_iter().map(CartResponse::from).collect();
    Ok(success_response(data))
}

/// Create a cart for the caller
#[utoipa::path(
    post,
    path = "/api/v1/carts",
    responses(
        (status = 201, description = "Cart created", body = CartResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Carts"
)]
pub async fn create_cart(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .carts
        .create_cart(&user)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(CartResponse {
        id: cart.id,
        items: vec![],
        created_at: cart.created_at,
        updated_at: cart.updated_at,
    }))
}

/// Get one of the caller's carts with its items
#[utoipa::path(
    get,
    path = "/api/v1/carts/:cart_id",
    params(("cart_id" = Uuid, Path, description = "Cart ID")),
    responses(
        (status = 200, description = "Cart retrieved", body = CartResponse),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Carts"
)]
pub async fn get_cart(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .carts
        .get_cart(&user, cart_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CartResponse::from(cart)))
}

/// Delete one of the caller's carts
#[utoipa::path(
    delete,
    path = "/api/v1/carts/:cart_id",
    params(("cart_id" = Uuid, Path, description = "Cart ID")),
    responses(
        (status = 204, description = "Cart deleted"),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Carts"
)]
pub async fn delete_cart(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .carts
        .delete_cart(&user, cart_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// List items in a cart
#[utoipa::path(
    get,
    path = "/api/v1/carts/:cart_id/items",
    params(("cart_id" = Uuid, Path, description = "Cart ID")),
    responses(
        (status = 200, description = "Items retrieved", body = [CartItemResponse]),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart Items"
)]
pub async fn list_cart_items(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let items = state
        .services
        .carts
        .list_items(&user, cart_id)
        .await
        .map_err(map_service_error)?;

    let data: Vec<CartItemResponse> = items.into_iter().map(CartItemResponse::from).collect();
    Ok(success_response(data))
}

/// Add an item to a cart. The target cart comes from the path; an existing
/// line for the same product absorbs the quantity.
#[utoipa::path(
    post,
    path = "/api/v1/carts/:cart_id/items",
    params(("cart_id" = Uuid, Path, description = "Cart ID")),
    request_body = AddCartItemRequest,
    responses(
        (status = 201, description = "Item added", body = CartItemResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart Items"
)]
pub async fn add_cart_item(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
    Json(payload): Json<AddCartItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let line = state
        .services
        .carts
        .add_item(
            &user,
            cart_id,
            AddToCartInput {
                product_id: payload.product_id,
                quantity: payload.quantity,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(created_response(CartItemResponse::from(line)))
}

/// Get a cart item
#[utoipa::path(
    get,
    path = "/api/v1/carts/:cart_id/items/:item_id",
    params(
        ("cart_id" = Uuid, Path, description = "Cart ID"),
        ("item_id" = Uuid, Path, description = "Cart item ID")
    ),
    responses(
        (status = 200, description = "Item retrieved", body = CartItemResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart Items"
)]
pub async fn get_cart_item(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let line = state
        .services
        .carts
        .get_item(&user, cart_id, item_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CartItemResponse::from(line)))
}

/// Update a cart item's quantity
#[utoipa::path(
    put,
    path = "/api/v1/carts/:cart_id/items/:item_id",
    params(
        ("cart_id" = Uuid, Path, description = "Cart ID"),
        ("item_id" = Uuid, Path, description = "Cart item ID")
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Item updated", body = CartItemResponse),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart Items"
)]
pub async fn update_cart_item(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let line = state
        .services
        .carts
        .update_item_quantity(&user, cart_id, item_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CartItemResponse::from(line)))
}

/// Remove an item from a cart
#[utoipa::path(
    delete,
    path = "/api/v1/carts/:cart_id/items/:item_id",
    params(
        ("cart_id" = Uuid, Path, description = "Cart ID"),
        ("item_id" = Uuid, Path, description = "Cart item ID")
    ),
    responses(
        (status = 204, description = "Item removed"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Cart Items"
)]
pub async fn remove_cart_item(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .carts
        .remove_item(&user, cart_id, item_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

// Request/response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub product: ProductResponse,
    pub quantity: i32,
}

impl From<CartLine> for CartItemResponse {
    fn from(line: CartLine) -> Self {
        Self {
            id: line.id,
            product: ProductResponse::from(line.product),
            quantity: line.quantity,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub items: Vec<CartItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CartWithItems> for CartResponse {
    fn from(cart: CartWithItems) -> Self {
        Self {
            id: cart.cart.id,
            items: cart.items.into_iter().map(CartItemResponse::from).collect(),
            created_at: cart.cart.created_at,
            updated_at: cart.cart.updated_at,
        }
    }
}
