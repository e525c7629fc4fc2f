//! evmap-discovery library interface
//!
//! Event-discovery pipeline (extraction, breaker/retry-gated sources,
//! normalization, error classification) plus its HTTP tool surface.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod sources;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use evmap_common::events::EventBus;
use services::DiscoveryService;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Module name used in logs, health and SSE
pub const MODULE_NAME: &str = "evmap-discovery";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DiscoveryService>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: Arc<DiscoveryService>) -> Self {
        let event_bus = service.event_bus().clone();
        Self {
            service,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::tool_routes())
        .merge(api::status_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
