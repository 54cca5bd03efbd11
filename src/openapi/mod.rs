use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = r#"
# Storefront API

Backend for a storefront: product catalog with reviews and wishlists,
per-user shopping carts, checkout into immutable orders, and an admin
statistics dashboard.

## Authentication

Most endpoints require a JWT bearer token issued by `POST /auth/login`:

```
Authorization: Bearer <your-jwt-token>
```

Catalog reads are open; catalog writes require staff capability, and the
admin statistics endpoint is staff only.

## Pagination

The product listing supports `page` and `per_page` query parameters
(default 20, max 100 per page), plus `search`, `category_id`,
`min_price`, `max_price` and `ordering`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Product Images", description = "Product image endpoints"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Reviews", description = "Product review endpoints"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Carts", description = "Shopping cart endpoints"),
        (name = "Cart Items", description = "Cart item endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Admin", description = "Administrative reporting endpoints"),
        (name = "Auth", description = "Account and token endpoints")
    ),
    paths(
        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::latest_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::list_product_images,
        crate::handlers::products::get_product_image,
        crate::handlers::products::add_product_image,
        crate::handlers::products::delete_product_image,

        // Categories
        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::create_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,

        // Reviews
        crate::handlers::reviews::list_reviews,
        crate::handlers::reviews::get_review,
        crate::handlers::reviews::create_review,
        crate::handlers::reviews::update_review,
        crate::handlers::reviews::delete_review,

        // Wishlist
        crate::handlers::wishlist::list_wishlist,
        crate::handlers::wishlist::get_wishlist_entry,
        crate::handlers::wishlist::add_to_wishlist,
        crate::handlers::wishlist::remove_from_wishlist,

        // Carts
        crate::handlers::carts::list_carts,
        crate::handlers::carts::create_cart,
        crate::handlers::carts::get_cart,
        crate::handlers::carts::delete_cart,
        crate::handlers::carts::list_cart_items,
        crate::handlers::carts::add_cart_item,
        crate::handlers::carts::get_cart_item,
        crate::handlers::carts::update_cart_item,
        crate::handlers::carts::remove_cart_item,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::create_order,
        crate::handlers::orders::update_payment_status,

        // Admin
        crate::handlers::admin_stats::admin_statistics,

        // Activation shim
        crate::handlers::activation::activate_account,
    ),
    components(
        schemas(
            // Catalog types
            crate::handlers::products::ProductResponse,
            crate::handlers::products::CreateProductRequest,
            crate::handlers::products::UpdateProductRequest,
            crate::handlers::products::ProductImageResponse,
            crate::handlers::products::CreateProductImageRequest,
            crate::handlers::categories::CategoryRequest,
            crate::handlers::categories::CategoryResponse,
            crate::handlers::reviews::CreateReviewRequest,
            crate::handlers::reviews::UpdateReviewRequest,
            crate::handlers::reviews::ReviewResponse,
            crate::handlers::wishlist::AddWishlistRequest,
            crate::handlers::wishlist::WishlistEntryResponse,

            // Cart and order types
            crate::handlers::carts::AddCartItemRequest,
            crate::handlers::carts::UpdateCartItemRequest,
            crate::handlers::carts::CartItemResponse,
            crate::handlers::carts::CartResponse,
            crate::handlers::orders::CreateOrderRequest,
            crate::handlers::orders::UpdatePaymentStatusRequest,
            crate::handlers::orders::OrderItemResponse,
            crate::handlers::orders::OrderResponse,
            crate::handlers::orders::OrderPaymentStatusResponse,
            crate::entities::order::PaymentStatus,

            // Reporting types
            crate::services::reporting::AdminStatistics,
            crate::services::reporting::MonthlySales,
            crate::services::reporting::PopularProduct,
            crate::services::reporting::TopBuyer,
            crate::services::reporting::RecentOrder,

            // Auth types
            crate::auth::RegisterRequest,
            crate::auth::LoginCredentials,
            crate::auth::RefreshTokenRequest,
            crate::auth::TokenPair,
            crate::auth::UserResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Storefront API"));
        assert!(json.contains("/api/v1/products"));
        assert!(json.contains("Bearer"));
    }
}
