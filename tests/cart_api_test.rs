mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn carts_require_authentication() {
    let app = TestApp::new().await;

    let (status, _) = app.request(Method::GET, "/api/v1/carts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.request(Method::POST, "/api/v1/carts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cart_item_belongs_to_the_cart_in_the_path() {
    let app = TestApp::new().await;
    let (_user, token) = app.create_user("Ada", "ada@example.com", false).await;
    let product = app.seed_product("Scarf", dec!(12)).await;

    let (status, cart) = app
        .request(Method::POST, "/api/v1/carts", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let cart_id = cart["id"].as_str().unwrap().to_string();

    // The payload has no say over which cart receives the item
    let (status, item) = app
        .request(
            Method::POST,
            &format!("/api/v1/carts/{cart_id}/items"),
            Some(&token),
            Some(json!({
                "product_id": product.id,
                "quantity": 2,
                "cart_id": "11111111-1111-1111-1111-111111111111"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["quantity"], 2);
    assert_eq!(item["product"]["id"], product.id.to_string());

    // The item shows up in the path's cart
    let (status, cart) = app
        .request(
            Method::GET,
            &format!("/api/v1/carts/{cart_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn adding_same_product_merges_quantities() {
    let app = TestApp::new().await;
    let (_user, token) = app.create_user("Ada", "ada@example.com", false).await;
    let product = app.seed_product("Socks", dec!(4)).await;

    let (_, cart) = app
        .request(Method::POST, "/api/v1/carts", Some(&token), None)
        .await;
    let cart_id = cart["id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let (status, _) = app
            .request(
                Method::POST,
                &format!("/api/v1/carts/{cart_id}/items"),
                Some(&token),
                Some(json!({ "product_id": product.id, "quantity": 3 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, items) = app
        .request(
            Method::GET,
            &format!("/api/v1/carts/{cart_id}/items"),
            Some(&token),
            None,
        )
        .await;
    let items = items.as_array().unwrap().clone();
    assert_eq!(items.len(), 1, "same product must merge into one line");
    assert_eq!(items[0]["quantity"], 6);
}

#[tokio::test]
async fn invalid_quantities_and_products_are_rejected() {
    let app = TestApp::new().await;
    let (_user, token) = app.create_user("Ada", "ada@example.com", false).await;
    let product = app.seed_product("Hat", dec!(9)).await;

    let (_, cart) = app
        .request(Method::POST, "/api/v1/carts", Some(&token), None)
        .await;
    let cart_id = cart["id"].as_str().unwrap().to_string();

    // Zero quantity
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/carts/{cart_id}/items"),
            Some(&token),
            Some(json!({ "product_id": product.id, "quantity": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown product
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/carts/{cart_id}/items"),
            Some(&token),
            Some(json!({
                "product_id": "22222222-2222-2222-2222-222222222222",
                "quantity": 1
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn carts_are_invisible_to_other_users() {
    let app = TestApp::new().await;
    let (_ada, ada_token) = app.create_user("Ada", "ada@example.com", false).await;
    let (_eve, eve_token) = app.create_user("Eve", "eve@example.com", false).await;

    let (_, cart) = app
        .request(Method::POST, "/api/v1/carts", Some(&ada_token), None)
        .await;
    let cart_id = cart["id"].as_str().unwrap().to_string();

    // Another user sees not-found, not forbidden
    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/v1/carts/{cart_id}"),
            Some(&eve_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // And cannot push items into it
    let product = app.seed_product("Gloves", dec!(14)).await;
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/carts/{cart_id}/items"),
            Some(&eve_token),
            Some(json!({ "product_id": product.id, "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Listing shows only the owner's carts
    let (_, eve_carts) = app
        .request(Method::GET, "/api/v1/carts", Some(&eve_token), None)
        .await;
    assert_eq!(eve_carts.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn cart_item_update_and_removal() {
    let app = TestApp::new().await;
    let (_user, token) = app.create_user("Ada", "ada@example.com", false).await;
    let product = app.seed_product("Belt", dec!(20)).await;

    let (_, cart) = app
        .request(Method::POST, "/api/v1/carts", Some(&token), None)
        .await;
    let cart_id = cart["id"].as_str().unwrap().to_string();

    let (_, item) = app
        .request(
            Method::POST,
            &format!("/api/v1/carts/{cart_id}/items"),
            Some(&token),
            Some(json!({ "product_id": product.id, "quantity": 1 })),
        )
        .await;
    let item_id = item["id"].as_str().unwrap().to_string();

    let (status, item) = app
        .request(
            Method::PUT,
            &format!("/api/v1/carts/{cart_id}/items/{item_id}"),
            Some(&token),
            Some(json!({ "quantity": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["quantity"], 5);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/carts/{cart_id}/items/{item_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, items) = app
        .request(
            Method::GET,
            &format!("/api/v1/carts/{cart_id}/items"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(items.as_array().unwrap().len(), 0);
}
