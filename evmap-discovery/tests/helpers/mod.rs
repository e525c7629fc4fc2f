//! Test Helper Utilities
//!
//! Shared utilities for testing evmap-discovery

#![allow(dead_code)]

pub mod log_capture;
pub mod mock_source;

pub use log_capture::{capture_logs, LogCapture};
pub use mock_source::{Reply, ScriptedSource};

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use evmap_common::events::{EventBus, SourceKind};
use evmap_common::ManualClock;
use evmap_discovery::auth::{MeetupOAuth, MEETUP_AUTHORIZE_URL};
use evmap_discovery::services::{
    CircuitBreaker, CircuitBreakerConfig, DiscoveryEngine, DiscoveryService, PromptAugmenter,
    QueryExtractor, RetryPolicy, SourceBinding,
};
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

pub const FAILURE_THRESHOLD: u32 = 2;
pub const RECOVERY_TIMEOUT: Duration = Duration::from_secs(60);
pub const MAX_ATTEMPTS: u32 = 3;
pub const BASE_DELAY: Duration = Duration::from_millis(100);

/// Wednesday 2026-04-15 12:00 UTC
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 15, 12, 0, 0).unwrap()
}

/// Everything an engine test needs to drive and inspect
pub struct Harness {
    pub clock: ManualClock,
    pub event_bus: EventBus,
    pub primary: Arc<ScriptedSource>,
    pub secondary: Arc<ScriptedSource>,
    pub primary_breaker: Arc<CircuitBreaker>,
    pub secondary_breaker: Arc<CircuitBreaker>,
}

impl Harness {
    pub fn new(primary: ScriptedSource, secondary: ScriptedSource) -> Self {
        let clock = ManualClock::new(test_now());
        let breaker = |kind| {
            Arc::new(CircuitBreaker::new(
                kind,
                CircuitBreakerConfig {
                    failure_threshold: FAILURE_THRESHOLD,
                    recovery_timeout: RECOVERY_TIMEOUT,
                },
                Arc::new(clock.clone()),
            ))
        };

        Self {
            primary_breaker: breaker(SourceKind::Meetup),
            secondary_breaker: breaker(SourceKind::Eventbrite),
            clock,
            event_bus: EventBus::new(64),
            primary: Arc::new(primary),
            secondary: Arc::new(secondary),
        }
    }

    fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            MAX_ATTEMPTS,
            BASE_DELAY,
            Duration::from_secs(5),
            Arc::new(self.clock.clone()),
        )
    }

    pub fn engine(&self) -> DiscoveryEngine {
        DiscoveryEngine::new(
            SourceBinding::new(self.primary.clone(), Arc::clone(&self.primary_breaker), self.retry()),
            SourceBinding::new(
                self.secondary.clone(),
                Arc::clone(&self.secondary_breaker),
                self.retry(),
            ),
            self.event_bus.clone(),
            Arc::new(self.clock.clone()),
        )
    }

    pub fn extractor(&self) -> QueryExtractor {
        QueryExtractor::new(
            Arc::new(self.clock.clone()),
            FixedOffset::east_opt(0).unwrap(),
            NonZeroU32::new(20).unwrap(),
        )
    }

    pub fn service(&self) -> DiscoveryService {
        DiscoveryService::new(
            self.extractor(),
            self.engine(),
            PromptAugmenter::new(FixedOffset::east_opt(0).unwrap()),
            Arc::new(MeetupOAuth::new(
                MEETUP_AUTHORIZE_URL,
                Some("test-client-id".to_string()),
                "http://localhost:8080/".to_string(),
            )),
            self.event_bus.clone(),
            Arc::new(self.clock.clone()),
        )
    }
}

/// Well-formed Meetup record
pub fn meetup_record(id: u64, name: &str) -> Value {
    json!({
        "id": id.to_string(),
        "name": name,
        "description": format!("{} description", name),
        "time": test_now().timestamp_millis() + 86_400_000,
        "duration": 7_200_000,
        "link": format!("https://www.meetup.com/events/{}", id),
        "is_online_event": id % 2 == 0,
    })
}

/// Well-formed Eventbrite record
pub fn eventbrite_record(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": {"text": name},
        "description": {"text": ""},
        "start": {"utc": "2026-04-16T18:00:00Z"},
        "end": {"utc": "2026-04-16T20:00:00Z"},
        "url": format!("https://www.eventbrite.com/e/{}", id),
        "online_event": false,
        "is_free": true,
    })
}
