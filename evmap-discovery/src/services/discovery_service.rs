//! Tool facade over the discovery pipeline
//!
//! text → extractor → engine → [`SearchResponse`]. Also serves
//! prompt augmentation, the auth setup URL and the status/config resources.

use crate::auth::{AuthCollaborator, AuthError, AuthSetup, MeetupOAuth};
use crate::config::{resolve_credentials, ConfigView};
use crate::models::{Event, EventQuery};
use crate::services::circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig};
use crate::services::discovery_engine::{DiscoveryEngine, SourceBinding};
use crate::services::error_classifier::{DiscoveryError, ErrorReport};
use crate::services::prompt_augmenter::PromptAugmenter;
use crate::services::query_extractor::QueryExtractor;
use crate::services::retry_policy::RetryPolicy;
use crate::sources::{build_http_client, EventSource, EventbriteClient, MeetupClient};
use evmap_common::config::TomlConfig;
use evmap_common::events::{CircuitState, DiscoveryEvent, EventBus, SourceKind};
use evmap_common::{Clock, Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Overall outcome of a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// At least one event
    Matches,
    /// No events and no source-level error: nothing matched
    NoMatches,
    /// No events and at least one source-level error
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub request_id: Uuid,
    pub query: EventQuery,
    pub events: Vec<Event>,
    pub sources_used: Vec<SourceKind>,
    pub errors: Vec<ErrorReport>,
    pub status: SearchStatus,
}

/// Status resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub breaker_states: BTreeMap<SourceKind, CircuitState>,
    /// True when every source has its credential
    pub auth_valid: bool,
    pub credentials: BTreeMap<SourceKind, bool>,
    pub breakers: BTreeMap<SourceKind, BreakerSnapshot>,
}

pub struct DiscoveryService {
    extractor: QueryExtractor,
    engine: DiscoveryEngine,
    augmenter: PromptAugmenter,
    auth: Arc<dyn AuthCollaborator>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    config_view: Option<ConfigView>,
}

impl DiscoveryService {
    /// Assemble from already-constructed parts
    pub fn new(
        extractor: QueryExtractor,
        engine: DiscoveryEngine,
        augmenter: PromptAugmenter,
        auth: Arc<dyn AuthCollaborator>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            extractor,
            engine,
            augmenter,
            auth,
            event_bus,
            clock,
            config_view: None,
        }
    }

    /// Build the production pipeline: HTTP sources, one breaker and retry
    /// policy per source, credentials resolved from ENV and TOML
    pub fn from_config(config: &TomlConfig, event_bus: EventBus, clock: Arc<dyn Clock>) -> Result<Self> {
        let credentials = resolve_credentials(config);
        let http = build_http_client()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;
        let call_timeout = config.discovery.call_timeout();

        let meetup_cfg = &config.sources.meetup;
        let meetup: Arc<dyn EventSource> = Arc::new(MeetupClient::new(
            http.clone(),
            meetup_cfg.base_url.as_deref(),
            credentials.meetup_access_token.clone(),
            meetup_cfg.requests_per_second,
        ));

        let eventbrite_cfg = &config.sources.eventbrite;
        let eventbrite: Arc<dyn EventSource> = Arc::new(EventbriteClient::new(
            http,
            eventbrite_cfg.base_url.as_deref(),
            credentials.eventbrite_token.clone(),
            eventbrite_cfg.requests_per_second,
        ));

        let primary = SourceBinding::new(
            meetup,
            Arc::new(CircuitBreaker::new(
                SourceKind::Meetup,
                CircuitBreakerConfig::from(meetup_cfg),
                Arc::clone(&clock),
            )),
            RetryPolicy::from_config(meetup_cfg, call_timeout, Arc::clone(&clock)),
        );
        let secondary = SourceBinding::new(
            eventbrite,
            Arc::new(CircuitBreaker::new(
                SourceKind::Eventbrite,
                CircuitBreakerConfig::from(eventbrite_cfg),
                Arc::clone(&clock),
            )),
            RetryPolicy::from_config(eventbrite_cfg, call_timeout, Arc::clone(&clock)),
        );

        let engine = DiscoveryEngine::new(primary, secondary, event_bus.clone(), Arc::clone(&clock));
        let extractor = QueryExtractor::from_config(&config.discovery, Arc::clone(&clock));
        let augmenter = PromptAugmenter::new(extractor.offset());
        let auth: Arc<dyn AuthCollaborator> = Arc::new(MeetupOAuth::from_credentials(&credentials));

        let mut service = Self::new(extractor, engine, augmenter, auth, event_bus, clock);
        service.config_view = Some(ConfigView::new(config, &credentials));

        info!(
            meetup_ready = credentials.meetup_access_token.is_some(),
            eventbrite_ready = credentials.eventbrite_token.is_some(),
            "Discovery service initialized"
        );

        Ok(service)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Extract, discover, truncate
    ///
    /// Never fails; an unusable search is reported through `status` and
    /// `errors`.
    pub async fn search_events(&self, raw_query: &str, max_results: Option<u32>) -> SearchResponse {
        let request_id = Uuid::new_v4();
        self.event_bus.emit_lossy(DiscoveryEvent::DiscoveryStarted {
            request_id,
            query: raw_query.to_string(),
            timestamp: self.clock.now(),
        });

        let query = self.extractor.extract_with_limit(raw_query, max_results);
        let outcome = self.engine.discover_with_id(request_id, &query).await;

        let mut events = outcome.events;
        events.truncate(query.max_results.get() as usize);

        let status = search_status(&events, &outcome.errors);

        let errors: Vec<ErrorReport> = outcome
            .errors
            .iter()
            .chain(outcome.record_errors.iter())
            .map(DiscoveryError::report)
            .collect();

        self.event_bus.emit_lossy(DiscoveryEvent::DiscoveryCompleted {
            request_id,
            event_count: events.len(),
            sources_used: outcome.sources_used.clone(),
            error_count: errors.len(),
            timestamp: self.clock.now(),
        });

        info!(
            request_id = %request_id,
            events = events.len(),
            status = ?status,
            "Search completed"
        );

        SearchResponse {
            request_id,
            query,
            events,
            sources_used: outcome.sources_used,
            errors,
            status,
        }
    }

    /// Prompt with a "Relevant Events" block appended
    pub async fn augment_prompt(&self, prompt: &str) -> String {
        let response = self.search_events(prompt, None).await;
        self.augmenter.augment(
            prompt,
            &response.events,
            response.status == SearchStatus::Failed,
        )
    }

    pub fn auth_setup(&self) -> std::result::Result<AuthSetup, AuthError> {
        self.auth.setup()
    }

    pub fn status(&self) -> StatusReport {
        let mut report = StatusReport {
            breaker_states: BTreeMap::new(),
            auth_valid: true,
            credentials: BTreeMap::new(),
            breakers: BTreeMap::new(),
        };

        for binding in self.engine.bindings() {
            let kind = binding.kind();
            let snapshot = binding.breaker.snapshot();
            let has_credentials = binding.source.has_credentials();

            report.breaker_states.insert(kind, snapshot.state);
            report.breakers.insert(kind, snapshot);
            report.credentials.insert(kind, has_credentials);
            report.auth_valid &= has_credentials;
        }

        report
    }

    /// Redacted effective configuration; `None` when assembled by hand
    pub fn config_view(&self) -> Option<&ConfigView> {
        self.config_view.as_ref()
    }
}

/// `Failed` iff no events and at least one source-level error
///
/// Dropped-record errors never make a search fail on their own.
pub fn search_status(events: &[Event], source_errors: &[DiscoveryError]) -> SearchStatus {
    if !events.is_empty() {
        SearchStatus::Matches
    } else if source_errors.is_empty() {
        SearchStatus::NoMatches
    } else {
        SearchStatus::Failed
    }
}
