mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = TestApp::new().await;
    let payload = json!({
        "name": "Ada",
        "email": "ada@example.com",
        "password": "correct-horse-battery"
    });

    let (status, _) = app
        .request(Method::POST, "/auth/register", None, Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .request(Method::POST, "/auth/register", None, Some(payload))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "AUTH_EMAIL_TAKEN");
}

#[tokio::test]
async fn weak_registrations_are_rejected() {
    let app = TestApp::new().await;

    // Short password
    let (status, _) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "name": "Ada", "email": "ada@example.com", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Invalid email
    let (status, _) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "name": "Ada", "email": "not-an-email", "password": "long-enough-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn me_returns_the_token_owner() {
    let app = TestApp::new().await;
    let (user, token) = app.create_user("Ada", "ada@example.com", false).await;

    let (status, body) = app
        .request(Method::GET, "/auth/me", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user.id.to_string());
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["is_staff"], false);

    // No token, no identity
    let (status, _) = app.request(Method::GET, "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_the_pair_and_refresh_tokens_cannot_call_the_api() {
    let app = TestApp::new().await;
    let (user, _token) = app.create_user("Ada", "ada@example.com", false).await;
    let pair = app.auth.generate_token(&user).await.unwrap();

    // A refresh token is not an access token
    let (status, _) = app
        .request(
            Method::GET,
            "/auth/me",
            Some(&pair.refresh_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Exchange it for a fresh pair
    let (status, body) = app
        .request(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": pair.refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let new_access = body["access_token"].as_str().unwrap().to_string();

    let (status, me) = app
        .request(Method::GET, "/auth/me", Some(&new_access), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user.id.to_string());

    // The old refresh token was revoked by the rotation
    let (status, _) = app
        .request(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": pair.refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_access_token() {
    let app = TestApp::new().await;
    let (_user, token) = app.create_user("Ada", "ada@example.com", false).await;

    let (status, _) = app
        .request(Method::POST, "/auth/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(Method::GET, "/auth/me", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
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
    app.auth
        .activate_account(&registered.activation_uid, &registered.activation_token)
        .await
        .unwrap();

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_INVALID_CREDENTIALS");
}
