use crate::auth::{AuthError, AuthService};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Message returned when activation succeeds
pub const ACTIVATION_SUCCESS_MESSAGE: &str = "Your account has been successfully activated!";

/// Router for the browser-facing activation link.
///
/// Activation itself is a state-changing operation on the identity layer;
/// this route exists so the link in the activation mail can be a plain GET.
pub fn activation_routes() -> Router<Arc<AuthService>> {
    Router::new().route("/activate/:uid/:token", get(activate_account))
}

/// Activate an account from an emailed uid/token pair.
///
/// Success maps the identity layer's silent completion to a fixed,
/// human-readable confirmation. Identity-layer failures pass through with
/// their own status and body; anything unexpected becomes a plain 500
/// carrying the error description.
#[utoipa::path(
    get,
    path = "/activate/:uid/:token",
    params(
        ("uid" = String, Path, description = "Opaque account reference"),
        ("token" = String, Path, description = "Single-use activation token")
    ),
    responses(
        (status = 200, description = "Account activated"),
        (status = 400, description = "Invalid or expired uid/token pair"),
        (status = 500, description = "Unexpected failure")
    ),
    tag = "Auth"
)]
pub async fn activate_account(
    State(auth_service): State<Arc<AuthService>>,
    Path((uid, token)): Path<(String, String)>,
) -> Response {
    match auth_service.activate_account(&uid, &token).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": ACTIVATION_SUCCESS_MESSAGE })),
        )
            .into_response(),
        Err(AuthError::DatabaseError(detail)) | Err(AuthError::InternalError(detail)) => {
            error!("Account activation failed unexpectedly: {}", detail);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": detail })),
            )
                .into_response()
        }
        // Forward the identity layer's own error shape and status untouched
        Err(e) => e.into_response(),
    }
}
