//! Meetup REST client (primary source)
//!
//! `GET {base}/find/upcoming_events` with a bearer token obtained through the
//! OAuth setup flow (see [`crate::auth`]).

use super::{present, rate_limiter, send_for_records, EventSource, SourceRateLimiter};
use crate::models::{EventQuery, RawPayload};
use crate::services::error_classifier::SourceError;
use async_trait::async_trait;
use chrono::SecondsFormat;
use evmap_common::events::SourceKind;
use tracing::debug;

pub const MEETUP_API_URL: &str = "https://api.meetup.com";

pub struct MeetupClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    rate_limiter: SourceRateLimiter,
}

impl MeetupClient {
    /// # Arguments
    /// * `client` - Shared HTTP client
    /// * `base_url` - API root override; [`MEETUP_API_URL`] when `None`
    /// * `access_token` - OAuth bearer token; calls fail with an
    ///   authentication error while it is absent
    /// * `requests_per_second` - Politeness limit
    pub fn new(
        client: reqwest::Client,
        base_url: Option<&str>,
        access_token: Option<String>,
        requests_per_second: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url
                .unwrap_or(MEETUP_API_URL)
                .trim_end_matches('/')
                .to_string(),
            access_token,
            rate_limiter: rate_limiter(requests_per_second),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/find/upcoming_events", self.base_url)
    }
}

/// Query parameters for `find/upcoming_events`
pub fn search_params(query: &EventQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("page", query.max_results.get().to_string()),
        ("status", "upcoming".to_string()),
    ];

    if let Some(place) = query.place() {
        params.push(("location", place.to_string()));
    }

    if let Some(window) = query.time_window {
        params.push((
            "start_date_range",
            window.start().to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
        params.push((
            "end_date_range",
            window.end().to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
    }

    if let Some(text) = query.topic_text() {
        params.push(("text", text));
    }

    params
}

#[async_trait]
impl EventSource for MeetupClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Meetup
    }

    async fn fetch(&self, query: &EventQuery) -> Result<RawPayload, SourceError> {
        let token = present(self.access_token.as_deref()).ok_or_else(|| {
            SourceError::MissingCredential("no Meetup access token configured".to_string())
        })?;

        let params = search_params(query);
        debug!(source = "meetup", ?params, "Searching Meetup events");

        let request = self
            .client
            .get(self.endpoint())
            .bearer_auth(token)
            .query(&params);

        let records = send_for_records(request).await?;
        debug!(source = "meetup", count = records.len(), "Meetup search returned");

        Ok(RawPayload::new(SourceKind::Meetup, records))
    }

    async fn ready(&self) {
        self.rate_limiter.until_ready().await;
    }

    fn has_credentials(&self) -> bool {
        present(self.access_token.as_deref()).is_some()
    }
}
