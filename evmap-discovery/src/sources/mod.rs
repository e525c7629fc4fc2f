//! Event-search backends
//!
//! Each backend implements [`EventSource`]. The discovery engine only sees
//! the trait, so tests substitute scripted sources.

use crate::models::{EventQuery, RawPayload};
use crate::services::error_classifier::SourceError;
use async_trait::async_trait;
use evmap_common::events::SourceKind;
use serde_json::Value;
use std::num::NonZeroU32;

pub mod eventbrite;
pub mod meetup;

pub use eventbrite::EventbriteClient;
pub use meetup::MeetupClient;

/// User agent sent to both backends
pub const USER_AGENT: &str = concat!("evmap-discovery/", env!("CARGO_PKG_VERSION"));

/// Politeness limiter shared by the HTTP clients
pub type SourceRateLimiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// One external event-search backend
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Which backend this is
    fn kind(&self) -> SourceKind;

    /// Issue one search request
    ///
    /// # Returns
    /// * `Ok(RawPayload)` - Records exactly as returned (possibly empty)
    /// * `Err(SourceError)` - Raw failure, classified by the caller
    async fn fetch(&self, query: &EventQuery) -> Result<RawPayload, SourceError>;

    /// Wait until the source's request budget admits another call
    ///
    /// Awaited before every `fetch`, outside the per-call timeout.
    async fn ready(&self) {}

    /// Whether the credentials this source needs are present
    fn has_credentials(&self) -> bool {
        true
    }
}

/// Build the HTTP client shared by both backends
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}

/// Rate limiter admitting `requests_per_second` (at least 1)
pub fn rate_limiter(requests_per_second: u32) -> SourceRateLimiter {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    governor::RateLimiter::direct(governor::Quota::per_second(rate))
}

/// Credential value, treating blank as absent
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Send a prepared request and pull the `events` array out of the body
///
/// Non-success statuses become [`SourceError::Http`] carrying the body text;
/// a body without an `events` array is a [`SourceError::Parse`].
pub(crate) async fn send_for_records(
    request: reqwest::RequestBuilder,
) -> Result<Vec<Value>, SourceError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Http {
            status: status.as_u16(),
            body,
        });
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| SourceError::Parse(format!("response body is not JSON: {}", e)))?;

    records_from_body(body)
}

/// Extract `events[]` from a decoded response body
pub(crate) fn records_from_body(mut body: Value) -> Result<Vec<Value>, SourceError> {
    match body.get_mut("events").map(Value::take) {
        Some(Value::Array(records)) => Ok(records),
        Some(Value::Null) => Ok(Vec::new()),
        Some(other) => Err(SourceError::Parse(format!(
            "`events` is not an array (found {})",
            json_type_name(&other)
        ))),
        None => Err(SourceError::Parse("response has no `events` field".to_string())),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
