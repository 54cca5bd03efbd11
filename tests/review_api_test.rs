mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn review_author_is_stamped_from_the_caller() {
    let app = TestApp::new().await;
    let (ada, token) = app.create_user("Ada", "ada@example.com", false).await;
    let product = app.seed_product("Kettle", dec!(30)).await;

    let (status, review) = app
        .request(
            Method::POST,
            &format!("/api/v1/products/{}/reviews", product.id),
            Some(&token),
            Some(json!({ "rating": 4, "body": "Boils fast", "user_id": "33333333-3333-3333-3333-333333333333" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    // Whatever the payload said, the caller is the author
    assert_eq!(review["user_id"], ada.id.to_string());
    assert_eq!(review["product_id"], product.id.to_string());
    assert_eq!(review["rating"], 4);
}

#[tokio::test]
async fn one_review_per_user_and_product() {
    let app = TestApp::new().await;
    let (_ada, token) = app.create_user("Ada", "ada@example.com", false).await;
    let product = app.seed_product("Teapot", dec!(25)).await;

    let payload = json!({ "rating": 5, "body": "Lovely" });
    let uri = format!("/api/v1/products/{}/reviews", product.id);

    let (status, _) = app
        .request(Method::POST, &uri, Some(&token), Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request(Method::POST, &uri, Some(&token), Some(payload))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn ratings_outside_the_scale_are_rejected() {
    let app = TestApp::new().await;
    let (_ada, token) = app.create_user("Ada", "ada@example.com", false).await;
    let product = app.seed_product("Mug", dec!(8)).await;
    let uri = format!("/api/v1/products/{}/reviews", product.id);

    for rating in [0, 6] {
        let (status, _) = app
            .request(
                Method::POST,
                &uri,
                Some(&token),
                Some(json!({ "rating": rating, "body": "out of range" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn non_staff_listing_never_shows_foreign_reviews() {
    let app = TestApp::new().await;
    let (_ada, ada_token) = app.create_user("Ada", "ada@example.com", false).await;
    let (eve, eve_token) = app.create_user("Eve", "eve@example.com", false).await;
    let (_staff, staff_token) = app.create_user("Ops", "ops@example.com", true).await;
    let product = app.seed_product("Lamp", dec!(45)).await;
    let uri = format!("/api/v1/products/{}/reviews", product.id);

    app.request(
        Method::POST,
        &uri,
        Some(&ada_token),
        Some(json!({ "rating": 5, "body": "Bright" })),
    )
    .await;
    app.request(
        Method::POST,
        &uri,
        Some(&eve_token),
        Some(json!({ "rating": 2, "body": "Flickers" })),
    )
    .await;

    // Anonymous callers cannot list reviews at all
    let (status, _) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Eve sees only her own review
    let (status, body) = app.request(Method::GET, &uri, Some(&eve_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let reviews = body.as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["user_id"], eve.id.to_string());

    // Staff see every review for the product
    let (status, body) = app
        .request(Method::GET, &uri, Some(&staff_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn only_the_author_can_modify_or_delete() {
    let app = TestApp::new().await;
    let (_ada, ada_token) = app.create_user("Ada", "ada@example.com", false).await;
    let (_eve, eve_token) = app.create_user("Eve", "eve@example.com", false).await;
    let (_staff, staff_token) = app.create_user("Ops", "ops@example.com", true).await;
    let product = app.seed_product("Desk", dec!(150)).await;
    let base = format!("/api/v1/products/{}/reviews", product.id);

    let (_, review) = app
        .request(
            Method::POST,
            &base,
            Some(&ada_token),
            Some(json!({ "rating": 3, "body": "Wobbly" })),
        )
        .await;
    let review_id = review["id"].as_str().unwrap().to_string();
    let item_uri = format!("{base}/{review_id}");

    // Another customer cannot even see it
    let (status, _) = app
        .request(Method::PUT, &item_uri, Some(&eve_token), Some(json!({ "rating": 1 })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Staff can read it but not rewrite someone else's words
    let (status, _) = app
        .request(Method::GET, &item_uri, Some(&staff_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .request(Method::PUT, &item_uri, Some(&staff_token), Some(json!({ "rating": 1 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The author can update and delete
    let (status, updated) = app
        .request(
            Method::PUT,
            &item_uri,
            Some(&ada_token),
            Some(json!({ "rating": 2, "body": "Still wobbly" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["rating"], 2);

    let (status, _) = app
        .request(Method::DELETE, &item_uri, Some(&ada_token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
