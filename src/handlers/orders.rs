use crate::auth::consts as perm;
use crate::auth::{AuthRouterExt, AuthenticatedUser};
use crate::entities::{order_item, PaymentStatus};
use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input,
};
use crate::{errors::ApiError, services::orders::OrderWithItems, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for order endpoints. Orders are owner-scoped; the
/// payment-status transition is reserved for the payment flow.
pub fn orders_routes() -> Router<AppState> {
    let payment = Router::new()
        .route("/:order_id/payment-status", put(update_payment_status))
        .with_permission(perm::PAYMENTS_MANAGE);

    Router::new()
        .route("/", get(list_orders))
        .route("/", post(create_order))
        .route("/:order_id", get(get_order))
        .with_auth()
        .merge(payment)
}

/// List the caller's orders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Orders retrieved", body = [OrderResponse]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let orders = state
        .services
        .orders
        .list_orders(&user)
        .await
        .map_err(map_service_error)?;

    let data: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(success_response(data))
}

/// Get one of the caller's orders
#[utoipa::path(
    get,
    path = "/api/v1/orders/:order_id",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved", body = OrderResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(&user, order_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(OrderResponse::from(order)))
}

/// Place an order from one of the caller's carts.
///
/// Cart lines become order lines with the current product price
/// snapshotted; the cart is deleted. Any payment status in the payload is
/// ignored: orders always start pending.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Empty cart or invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .orders
        .checkout(&user, payload.cart_id)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(OrderResponse::from(order)))
}

/// Advance an order's payment status (payment flow only)
#[utoipa::path(
    put,
    path = "/api/v1/orders/:order_id/payment-status",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    request_body = UpdatePaymentStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderPaymentStatusResponse),
        (status = 400, description = "Order already settled", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .update_payment_status(order_id, payload.payment_status)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(OrderPaymentStatusResponse {
        id: order.id,
        payment_status: order.payment_status,
        placed_at: order.placed_at,
    }))
}

// Request/response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    /// The cart to convert into an order
    pub cart_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderPaymentStatusResponse {
    pub id: Uuid,
    pub payment_status: PaymentStatus,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    #[schema(value_type = String, example = "19.99")]
    pub unit_price: Decimal,
}

impl From<order_item::Model> for OrderItemResponse {
    fn from(model: order_item::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub payment_status: PaymentStatus,
    pub placed_at: DateTime<Utc>,
    /// Sum of unit_price x quantity across the items
    #[schema(value_type = String, example = "59.97")]
    pub total_amount: Decimal,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderWithItems> for OrderResponse {
    fn from(order: OrderWithItems) -> Self {
        Self {
            id: order.order.id,
            payment_status: order.order.payment_status,
            placed_at: order.order.placed_at,
            total_amount: order.total_amount,
            items: order
                .items
                .into_iter()
                .map(OrderItemResponse::from)
                .collect(),
        }
    }
}
