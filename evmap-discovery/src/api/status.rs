//! Status and configuration resources

use crate::config::ConfigView;
use crate::error::{ApiError, ApiResult};
use crate::services::StatusReport;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};

/// GET /status
///
/// Breaker state per source and whether every source has its credential.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.service.status())
}

/// GET /config
///
/// Effective configuration with secrets redacted.
pub async fn get_config(State(state): State<AppState>) -> ApiResult<Json<ConfigView>> {
    state
        .service
        .config_view()
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("configuration view not available".to_string()))
}

/// Build status routes
pub fn status_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/config", get(get_config))
}
