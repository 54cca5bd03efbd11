mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn wishlist_is_scoped_to_the_caller() {
    let app = TestApp::new().await;
    let (_ada, ada_token) = app.create_user("Ada", "ada@example.com", false).await;
    let (_eve, eve_token) = app.create_user("Eve", "eve@example.com", false).await;
    let product = app.seed_product("Poster", dec!(18)).await;

    let (status, entry) = app
        .request(
            Method::POST,
            "/api/v1/wishlist",
            Some(&ada_token),
            Some(json!({ "product_id": product.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["product"]["id"], product.id.to_string());
    let entry_id = entry["id"].as_str().unwrap().to_string();

    // Eve's list is empty and Ada's entry is invisible to her
    let (_, eve_list) = app
        .request(Method::GET, "/api/v1/wishlist", Some(&eve_token), None)
        .await;
    assert_eq!(eve_list.as_array().unwrap().len(), 0);

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/v1/wishlist/{entry_id}"),
            Some(&eve_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Ada sees exactly one entry
    let (_, ada_list) = app
        .request(Method::GET, "/api/v1/wishlist", Some(&ada_token), None)
        .await;
    assert_eq!(ada_list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_wishlist_entries_conflict() {
    let app = TestApp::new().await;
    let (_ada, token) = app.create_user("Ada", "ada@example.com", false).await;
    let product = app.seed_product("Print", dec!(22)).await;
    let payload = json!({ "product_id": product.id });

    let (status, _) = app
        .request(Method::POST, "/api/v1/wishlist", Some(&token), Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request(Method::POST, "/api/v1/wishlist", Some(&token), Some(payload))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn wishlist_rejects_unknown_products_and_supports_removal() {
    let app = TestApp::new().await;
    let (_ada, token) = app.create_user("Ada", "ada@example.com", false).await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/wishlist",
            Some(&token),
            Some(json!({ "product_id": "44444444-4444-4444-4444-444444444444" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let product = app.seed_product("Frame", dec!(12)).await;
    let (_, entry) = app
        .request(
            Method::POST,
            "/api/v1/wishlist",
            Some(&token),
            Some(json!({ "product_id": product.id })),
        )
        .await;
    let entry_id = entry["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/wishlist/{entry_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = app
        .request(Method::GET, "/api/v1/wishlist", Some(&token), None)
        .await;
    assert_eq!(list.as_array().unwrap().len(), 0);
}
