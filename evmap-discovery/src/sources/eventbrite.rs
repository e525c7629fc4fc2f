//! Eventbrite v3 client (secondary source)

use super::{present, rate_limiter, send_for_records, EventSource, SourceRateLimiter};
use crate::models::{EventQuery, LocationHint, RawPayload};
use crate::services::error_classifier::SourceError;
use async_trait::async_trait;
use chrono::SecondsFormat;
use evmap_common::events::SourceKind;
use tracing::debug;

pub const EVENTBRITE_API_URL: &str = "https://www.eventbriteapi.com/v3";

/// Largest page the search endpoint accepts
const MAX_PAGE_SIZE: u32 = 50;

/// Search radius around a named place
const SEARCH_RADIUS: &str = "25km";

pub struct EventbriteClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    rate_limiter: SourceRateLimiter,
}

impl EventbriteClient {
    pub fn new(
        client: reqwest::Client,
        base_url: Option<&str>,
        token: Option<String>,
        requests_per_second: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url
                .unwrap_or(EVENTBRITE_API_URL)
                .trim_end_matches('/')
                .to_string(),
            token,
            rate_limiter: rate_limiter(requests_per_second),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/events/search/", self.base_url)
    }
}

/// Query parameters for `events/search/`
pub fn search_params(query: &EventQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();

    if let Some(place) = query.place() {
        params.push(("location.address", place.to_string()));
        params.push(("location.within", SEARCH_RADIUS.to_string()));
    }

    if let Some(window) = query.time_window {
        // UTC with a Z suffix, no offset form
        params.push((
            "start_date.range_start",
            window.start().to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
        params.push((
            "start_date.range_end",
            window.end().to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
    }

    if let Some(text) = query.topic_text() {
        params.push(("q", text));
    }

    if query.free_only == Some(true) {
        params.push(("price", "free".to_string()));
    }

    if query.location_hint == LocationHint::RemoteOnly {
        params.push(("online_events_only", "true".to_string()));
    }

    params.push((
        "page_size",
        query.max_results.get().min(MAX_PAGE_SIZE).to_string(),
    ));

    params
}

#[async_trait]
impl EventSource for EventbriteClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Eventbrite
    }

    async fn fetch(&self, query: &EventQuery) -> Result<RawPayload, SourceError> {
        let token = present(self.token.as_deref()).ok_or_else(|| {
            SourceError::MissingCredential("no Eventbrite token configured".to_string())
        })?;

        let params = search_params(query);
        debug!(source = "eventbrite", ?params, "Searching Eventbrite events");

        let request = self
            .client
            .get(self.endpoint())
            .bearer_auth(token)
            .query(&params);

        let records = send_for_records(request).await?;
        debug!(source = "eventbrite", count = records.len(), "Eventbrite search returned");

        Ok(RawPayload::new(SourceKind::Eventbrite, records))
    }

    async fn ready(&self) {
        self.rate_limiter.until_ready().await;
    }

    fn has_credentials(&self) -> bool {
        present(self.token.as_deref()).is_some()
    }
}
