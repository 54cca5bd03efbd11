use crate::auth::{AuthRouterExt, AuthenticatedUser};
use crate::entities::review;
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    errors::ApiError,
    services::reviews::{CreateReviewInput, UpdateReviewInput},
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

/// Review routes, nested under `/products/:product_id/reviews`.
/// All of them require an authenticated caller.
pub fn reviews_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reviews))
        .route("/", post(create_review))
        .route("/:review_id", get(get_review))
        .route("/:review_id", put(update_review))
        .route("/:review_id", patch(update_review))
        .route("/:review_id", delete(delete_review))
        .with_auth()
}

/// List reviews for a product. Staff see all reviews; everyone else sees
/// only their own.
#[utoipa::path(
    get,
    path = "/api/v1/products/:product_id/reviews",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Reviews retrieved", body = [ReviewResponse]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Reviews"
)]
pub async fn list_reviews(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let reviews = state
        .services
        .reviews
        .list_for_product(&user, product_id)
        .await
        .map_err(map_service_error)?;

    let data: Vec<ReviewResponse> = reviews.into_iter().map(ReviewResponse::from).collect();
    Ok(success_response(data))
}

/// Get a single review
#[utoipa::path(
    get,
    path = "/api/v1/products/:product_id/reviews/:review_id",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    responses(
        (status = 200, description = "Review retrieved", body = ReviewResponse),
        (status = 404, description = "Review not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Reviews"
)]
pub async fn get_review(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((product_id, review_id)): Path<(Uuid, Uuid)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let review = state
        .services
        .reviews
        .get(&user, product_id, review_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ReviewResponse::from(review)))
}

/// Create a review authored by the caller
#[utoipa::path(
    post,
    path = "/api/v1/products/:product_id/reviews",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created", body = ReviewResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already reviewed", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Reviews"
)]
pub async fn create_review(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let review = state
        .services
        .reviews
        .create(
            &user,
            product_id,
            CreateReviewInput {
                rating: payload.rating,
                body: payload.body,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ReviewResponse::from(review)))
}

/// Update a review (author only; the author stamp never changes)
#[utoipa::path(
    put,
    path = "/api/v1/products/:product_id/reviews/:review_id",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = ReviewResponse),
        (status = 403, description = "Not the author", body = crate::errors::ErrorResponse),
        (status = 404, description = "Review not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Reviews"
)]
pub async fn update_review(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((product_id, review_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let review = state
        .services
        .reviews
        .update(
            &user,
            product_id,
            review_id,
            UpdateReviewInput {
                rating: payload.rating,
                body: payload.body,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ReviewResponse::from(review)))
}

/// Delete a review (author only)
#[utoipa::path(
    delete,
    path = "/api/v1/products/:product_id/reviews/:review_id",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Not the author", body = crate::errors::ErrorResponse),
        (status = 404, description = "Review not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Reviews"
)]
pub async fn delete_review(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((product_id, review_id)): Path<(Uuid, Uuid)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .reviews
        .delete(&user, product_id, review_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

// Request/response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReviewRequest {
    /// Rating on the 1-5 scale
    #[validate(range(min = 1, max = 5))]
    pub rating: i16,
    #[validate(length(min = 1))]
    pub body: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i16>,
    pub body: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<review::Model> for ReviewResponse {
    fn from(model: review::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            user_id: model.user_id,
            rating: model.rating,
            body: model.body,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
