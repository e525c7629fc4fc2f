//! Tool endpoints
//!
//! - `POST /tools/search_events` - `{query, max_results?}` → [`SearchResponse`]
//! - `POST /tools/augment_prompt` - `{prompt}` → `{prompt}` with event context
//! - `GET /tools/auth_setup_url` - Meetup OAuth authorize URL and steps

use crate::auth::AuthSetup;
use crate::error::{ApiError, ApiResult};
use crate::services::SearchResponse;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct SearchEventsRequest {
    pub query: String,
    #[serde(default)]
    pub max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AugmentPromptRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct AugmentPromptResponse {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct AuthSetupResponse {
    #[serde(flatten)]
    pub setup: AuthSetup,
    /// Rendered for display in a chat
    pub text: String,
}

/// POST /tools/search_events
pub async fn search_events(
    State(state): State<AppState>,
    Json(request): Json<SearchEventsRequest>,
) -> ApiResult<Json<SearchResponse>> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    info!(max_results = ?request.max_results, "search_events tool invoked");
    let response = state
        .service
        .search_events(&request.query, request.max_results)
        .await;
    Ok(Json(response))
}

/// POST /tools/augment_prompt
pub async fn augment_prompt(
    State(state): State<AppState>,
    Json(request): Json<AugmentPromptRequest>,
) -> ApiResult<Json<AugmentPromptResponse>> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("prompt must not be empty".to_string()));
    }

    let prompt = state.service.augment_prompt(&request.prompt).await;
    Ok(Json(AugmentPromptResponse { prompt }))
}

/// GET /tools/auth_setup_url
pub async fn auth_setup_url(State(state): State<AppState>) -> ApiResult<Json<AuthSetupResponse>> {
    let setup = state.service.auth_setup()?;
    let text = setup.render();
    Ok(Json(AuthSetupResponse { setup, text }))
}

/// Build tool routes
pub fn tool_routes() -> Router<AppState> {
    Router::new()
        .route("/tools/search_events", post(search_events))
        .route("/tools/augment_prompt", post(augment_prompt))
        .route("/tools/auth_setup_url", get(auth_setup_url))
}
