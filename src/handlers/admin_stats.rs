use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;
use crate::handlers::common::map_service_error;
use crate::services::reporting::AdminStatistics;
use crate::{errors::ApiError, AppState};
use axum::{extract::State, response::Json, routing::get, Router};

/// Creates the router for the admin statistics dashboard (staff only)
pub fn admin_stats_routes() -> Router<AppState> {
    Router::new()
        .route("/statistics", get(admin_statistics))
        .with_permission(perm::REPORTS_VIEW)
}

/// The admin dashboard snapshot: monthly sales over the trailing year,
/// the ten most-ordered products, the ten biggest buyers, and the five
/// most recent orders. Read-only.
#[utoipa::path(
    get,
    path = "/api/v1/admin/statistics",
    responses(
        (status = 200, description = "Statistics retrieved", body = AdminStatistics),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 500, description = "Aggregation failure", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn admin_statistics(
    State(state): State<AppState>,
) -> Result<Json<AdminStatistics>, ApiError> {
    let stats = state
        .services
        .reporting
        .admin_statistics()
        .await
        .map_err(map_service_error)?;

    Ok(Json(stats))
}
