use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::entities::{product, product_image};
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::{
    errors::ApiError,
    services::catalog::{
        CreateProductInput, ProductOrdering, ProductSearchQuery, UpdateProductInput,
    },
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, patch, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Custom validator for Decimal minimum value
fn validate_decimal_min_zero(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("decimal_min_zero"));
    }
    Ok(())
}

/// Distinguishes an absent field from an explicit `null`
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Creates the router for product and product-image endpoints
pub fn products_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_product))
        .route("/:product_id", put(update_product))
        // All update fields are optional, so PATCH and PUT coincide
        .route("/:product_id", patch(update_product))
        .route("/:product_id", delete(delete_product))
        .route("/:product_id/images", post(add_product_image))
        .route("/:product_id/images/:image_id", delete(delete_product_image))
        .with_permission(perm::CATALOG_MANAGE);

    Router::new()
        .route("/", get(list_products))
        .route("/latest", get(latest_products))
        .route("/:product_id", get(get_product))
        .route("/:product_id/images", get(list_product_images))
        .route("/:product_id/images/:image_id", get(get_product_image))
        .nest("/:product_id/reviews", super::reviews::reviews_routes())
        .merge(protected)
}

/// List products with search, filtering, ordering and pagination
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListQuery, PaginationParams),
    responses(
        (status = 200, description = "Products retrieved", body = PaginatedResponse<ProductResponse>),
        (status = 400, description = "Invalid query", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let ordering = match params.ordering.as_deref() {
        None => ProductOrdering::default(),
        Some(raw) => ProductOrdering::parse(raw).ok_or_else(|| {
            ApiError::ValidationError(format!(
                "ordering must be one of price, -price, updated_at, -updated_at (got '{}')",
                raw
            ))
        })?,
    };

    let page = pagination.page.max(1);
    let per_page = pagination.per_page.clamp(1, 100);

    let query = ProductSearchQuery {
        search: params.search,
        category_id: params.category_id,
        min_price: params.min_price,
        max_price: params.max_price,
        ordering,
        page,
        per_page,
    };

    let (products, total) = state
        .services
        .catalog
        .list_products(query)
        .await
        .map_err(map_service_error)?;

    let data: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        data, page, per_page, total,
    )))
}

/// The eight most recently created products
#[utoipa::path(
    get,
    path = "/api/v1/products/latest",
    responses(
        (status = 200, description = "Latest products retrieved", body = [ProductResponse])
    ),
    tag = "Products"
)]
pub async fn latest_products(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let products = state
        .services
        .catalog
        .latest_products()
        .await
        .map_err(map_service_error)?;

    let data: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
    Ok(success_response(data))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/v1/products/:product_id",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product retrieved", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_product(product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductResponse::from(product)))
}

/// Create a product (staff only)
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::ValidationError(
            "Product name cannot be blank".to_string(),
        ));
    }

    let input = CreateProductInput {
        name,
        description: payload.description.unwrap_or_default(),
        price: payload.price,
        category_id: payload.category_id,
    };

    let product = state
        .services
        .catalog
        .create_product(input)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ProductResponse::from(product)))
}

/// Update a product (staff only)
#[utoipa::path(
    put,
    path = "/api/v1/products/:product_id",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let name = payload
        .name
        .map(|value| {
            let value = value.trim().to_string();
            if value.is_empty() {
                Err(ApiError::ValidationError(
                    "Product name cannot be blank".to_string(),
                ))
            } else {
                Ok(value)
            }
        })
        .transpose()?;

    let input = UpdateProductInput {
        name,
        description: payload.description,
        price: payload.price,
        category_id: payload.category_id,
    };

    let product = state
        .services
        .catalog
        .update_product(product_id, input)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductResponse::from(product)))
}

/// Delete a product (staff only)
#[utoipa::path(
    delete,
    path = "/api/v1/products/:product_id",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_product(product_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// List product images
#[utoipa::path(
    get,
    path = "/api/v1/products/:product_id/images",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Images retrieved", body = [ProductImageResponse]),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Product Images"
)]
pub async fn list_product_images(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let images = state
        .services
        .catalog
        .list_product_images(product_id)
        .await
        .map_err(map_service_error)?;

    let data: Vec<ProductImageResponse> =
        images.into_iter().map(ProductImageResponse::from).collect();
    Ok(success_response(data))
}

/// Get a product image
#[utoipa::path(
    get,
    path = "/api/v1/products/:product_id/images/:image_id",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image retrieved", body = ProductImageResponse),
        (status = 404, description = "Image not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Product Images"
)]
pub async fn get_product_image(
    State(state): State<AppState>,
    Path((product_id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let image = state
        .services
        .catalog
        .get_product_image(product_id, image_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductImageResponse::from(image)))
}

/// Attach an image to a product (staff only)
#[utoipa::path(
    post,
    path = "/api/v1/products/:product_id/images",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    request_body = CreateProductImageRequest,
    responses(
        (status = 201, description = "Image attached", body = ProductImageResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Product Images"
)]
pub async fn add_product_image(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<CreateProductImageRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let image = state
        .services
        .catalog
        .add_product_image(product_id, payload.url, payload.alt_text)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ProductImageResponse::from(image)))
}

/// Remove a product image (staff only)
#[utoipa::path(
    delete,
    path = "/api/v1/products/:product_id/images/:image_id",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 404, description = "Image not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Product Images"
)]
pub async fn delete_product_image(
    State(state): State<AppState>,
    Path((product_id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_product_image(product_id, image_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

// Request/response DTOs

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductListQuery {
    /// Case-insensitive match against name and description
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// One of `price`, `-price`, `updated_at`, `-updated_at`
    pub ordering: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "validate_decimal_min_zero")]
    pub price: Decimal,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_decimal_min_zero")]
    pub price: Option<Decimal>,
    /// `null` clears the category, omission leaves it unchanged
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub category_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductImageRequest {
    #[validate(length(min = 1))]
    pub url: String,
    pub alt_text: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            category_id: model.category_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductImageResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub url: String,
    pub alt_text: Option<String>,
}

impl From<product_image::Model> for ProductImageResponse {
    fn from(model: product_image::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            url: model.url,
            alt_text: model.alt_text,
        }
    }
}
