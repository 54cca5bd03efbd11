mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn product_reads_are_open_writes_are_staff_only() {
    let app = TestApp::new().await;
    let (_staff, staff_token) = app.create_user("Ops", "ops@example.com", true).await;
    let (_user, user_token) = app.create_user("Ada", "ada@example.com", false).await;

    let payload = json!({ "name": "Linen Shirt", "description": "Plain", "price": "25.00" });

    // Anonymous create is rejected
    let (status, _) = app
        .request(Method::POST, "/api/v1/products", None, Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Non-staff create is forbidden
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(&user_token),
            Some(payload.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Staff create succeeds
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(&staff_token),
            Some(payload),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Linen Shirt");
    let product_id = body["id"].as_str().unwrap().to_string();

    // Anonymous read is open
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{product_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Linen Shirt");

    // Non-staff delete is forbidden, staff delete works
    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/products/{product_id}"),
            Some(&user_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/products/{product_id}"),
            Some(&staff_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{product_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn latest_returns_at_most_eight_newest_first() {
    let app = TestApp::new().await;

    for i in 0..10 {
        app.seed_product(&format!("Product {i}"), dec!(10)).await;
    }

    let (status, body) = app
        .request(Method::GET, "/api/v1/products/latest", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let items = body.as_array().expect("array body");
    assert_eq!(items.len(), 8);

    // Newest first: created_at must be non-increasing
    let stamps: Vec<chrono::DateTime<chrono::FixedOffset>> = items
        .iter()
        .map(|p| chrono::DateTime::parse_from_rfc3339(p["created_at"].as_str().unwrap()).unwrap())
        .collect();
    for pair in stamps.windows(2) {
        assert!(pair[0] >= pair[1], "latest products out of order");
    }
    // The very first product seeded fell off the end
    assert!(items.iter().all(|p| p["name"] != "Product 0"));
}

#[tokio::test]
async fn product_listing_supports_search_filter_and_ordering() {
    let app = TestApp::new().await;

    app.seed_product("Wool Sweater", dec!(60)).await;
    app.seed_product("Wool Socks", dec!(8)).await;
    app.seed_product("Denim Jacket", dec!(90)).await;

    // Text search over name/description
    let (status, body) = app
        .request(Method::GET, "/api/v1/products?search=Wool", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 2);

    // Price range filter
    let (status, body) = app
        .request(
            Method::GET,
            "/api/v1/products?min_price=50&max_price=100",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Wool Sweater") && names.contains(&"Denim Jacket"));

    // Ascending price ordering
    let (status, body) = app
        .request(Method::GET, "/api/v1/products?ordering=price", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Wool Socks", "Wool Sweater", "Denim Jacket"]);

    // Unknown ordering key is a validation failure
    let (status, _) = app
        .request(Method::GET, "/api/v1/products?ordering=name", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn partial_update_touches_only_the_sent_fields() {
    let app = TestApp::new().await;
    let (_staff, staff_token) = app.create_user("Ops", "ops@example.com", true).await;
    let product = app.seed_product("Beanie", dec!(14)).await;

    let (status, body) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/products/{}", product.id),
            Some(&staff_token),
            Some(json!({ "price": "16.50" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], "16.50");
    // Untouched fields survive the partial update
    assert_eq!(body["name"], "Beanie");
    assert_eq!(body["description"], "Beanie description");
}

#[tokio::test]
async fn negative_price_is_rejected() {
    let app = TestApp::new().await;
    let (_staff, staff_token) = app.create_user("Ops", "ops@example.com", true).await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(&staff_token),
            Some(json!({ "name": "Broken", "price": "-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn categories_carry_product_counts_and_unique_names() {
    let app = TestApp::new().await;
    let (_staff, staff_token) = app.create_user("Ops", "ops@example.com", true).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/categories",
            Some(&staff_token),
            Some(json!({ "name": "Outerwear" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = body["id"].as_str().unwrap().to_string();

    // Duplicate name conflicts
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/categories",
            Some(&staff_token),
            Some(json!({ "name": "Outerwear" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Two products in the category
    for name in ["Parka", "Raincoat"] {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/v1/products",
                Some(&staff_token),
                Some(json!({ "name": name, "price": "120", "category_id": category_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .request(Method::GET, "/api/v1/categories", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let categories = body.as_array().unwrap();
    let outerwear = categories
        .iter()
        .find(|c| c["name"] == "Outerwear")
        .expect("category missing");
    assert_eq!(outerwear["product_count"], 2);

    // Category filter on the product list
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/products?category_id={category_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);
}

#[tokio::test]
async fn product_images_nest_under_their_product() {
    let app = TestApp::new().await;
    let (_staff, staff_token) = app.create_user("Ops", "ops@example.com", true).await;
    let product = app.seed_product("Gallery Tee", dec!(15)).await;

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/products/{}/images", product.id),
            Some(&staff_token),
            Some(json!({ "url": "https://cdn.example.com/tee.jpg", "alt_text": "front" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["product_id"], product.id.to_string());
    let image_id = body["id"].as_str().unwrap().to_string();

    // Listing is open
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}/images", product.id),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // The image is not reachable under a different product
    let other = app.seed_product("Other", dec!(5)).await;
    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}/images/{image_id}", other.id),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
