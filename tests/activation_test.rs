mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

const SUCCESS_MESSAGE: &str = "Your account has been successfully activated!";

#[tokio::test]
async fn activation_link_turns_registration_into_a_usable_account() {
    let app = TestApp::new().await;

    // Register through the API: account starts inactive
    let (status, body) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "name": "Ada",
                "email": "ada@example.com",
                "password": "correct-horse-battery"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_active"], false);

    // Login is refused until activation
    let credentials = json!({ "email": "ada@example.com", "password": "correct-horse-battery" });
    let (status, body) = app
        .request(Method::POST, "/auth/login", None, Some(credentials.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ACCOUNT_INACTIVE");

    // Mint a fresh activation pair the way the mailer would receive it
    let registered = app
        .auth
        .register(storefront_api::auth::RegisterRequest {
            name: "Eve".into(),
            email: "eve@example.com".into(),
            password: "another-strong-pass".into(),
        })
        .await
        .unwrap();

    let (status, body) = app
        .request(
            Method::GET,
            &format!(
                "/activate/{}/{}",
                registered.activation_uid, registered.activation_token
            ),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], SUCCESS_MESSAGE);

    // The activated account can log in
    let (status, body) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "eve@example.com", "password": "another-strong-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].as_str().unwrap().len() > 20);
    assert_eq!(body["token_type"], "Bearer");
}

#[tokio::test]
async fn activation_tokens_are_single_use() {
    let app = TestApp::new().await;
    let registered = app
        .auth
        .register(storefront_api::auth::RegisterRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "correct-horse-battery".into(),
        })
        .await
        .unwrap();
    let uri = format!(
        "/activate/{}/{}",
        registered.activation_uid, registered.activation_token
    );

    let (status, _) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);

    // Replaying the link forwards the identity layer's error untouched
    let (status, body) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "AUTH_INVALID_ACTIVATION_TOKEN");
}

#[tokio::test]
async fn malformed_activation_references_are_bad_requests() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(Method::GET, "/activate/not-base64/whatever", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "AUTH_INVALID_ACTIVATION_TOKEN");
}

#[tokio::test]
async fn wrong_token_for_a_real_user_is_rejected() {
    let app = TestApp::new().await;
    let registered = app
        .auth
        .register(storefront_api::auth::RegisterRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "correct-horse-battery".into(),
        })
        .await
        .unwrap();

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/activate/{}/totally-wrong-token", registered.activation_uid),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
