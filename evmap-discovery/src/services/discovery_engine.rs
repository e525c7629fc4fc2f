//! Sequential primary → secondary discovery with breaker and retry gating
//!
//! **Algorithm:**
//! 1. Primary breaker admits → call under retry policy
//!    - usable events (normalized, passing the query's filters): return them,
//!      secondary untouched
//!    - no usable events (empty payload, every record dropped or filtered
//!      out): fall back; this is not a failure
//!    - error: record failure, classify, fall back
//! 2. Same call/record logic against the secondary
//! 3. Both unavailable: no events plus the collected errors
//!
//! The engine never fails; callers decide what an empty result with errors
//! means for their user.

use crate::models::{Event, EventQuery, LocationHint, RawPayload};
use crate::services::circuit_breaker::{CircuitBreaker, StateChange};
use crate::services::error_classifier::DiscoveryError;
use crate::services::event_normalizer::EventNormalizer;
use crate::services::retry_policy::RetryPolicy;
use crate::sources::EventSource;
use evmap_common::events::{DiscoveryEvent, EventBus, SourceKind};
use evmap_common::Clock;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// A source together with the breaker and retry policy guarding it
pub struct SourceBinding {
    pub source: Arc<dyn EventSource>,
    pub breaker: Arc<CircuitBreaker>,
    pub retry: RetryPolicy,
}

impl SourceBinding {
    pub fn new(source: Arc<dyn EventSource>, breaker: Arc<CircuitBreaker>, retry: RetryPolicy) -> Self {
        Self {
            source,
            breaker,
            retry,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }
}

/// What one guarded source call produced
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    /// At least one raw record
    Results(RawPayload),
    /// The source answered with no records
    Empty,
    /// The call failed after retries (or was not retryable)
    Failed(DiscoveryError),
    /// The breaker refused the call; nothing was sent
    Skipped,
}

/// Engine result; never an error
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryOutcome {
    /// Usable events from the first source that had any, in record order
    pub events: Vec<Event>,
    /// Sources that answered successfully (including empty answers)
    pub sources_used: Vec<SourceKind>,
    /// Source-level failures, in the order they happened
    pub errors: Vec<DiscoveryError>,
    /// One per record dropped by the normalizer, from every source consulted
    pub record_errors: Vec<DiscoveryError>,
}

/// Whether an event satisfies the hard constraints of `query`
///
/// Backends cannot all express these filters, so they are applied to every
/// normalized event. `remote_allowed` only widens a search and never
/// excludes anything.
pub fn is_usable(query: &EventQuery, event: &Event) -> bool {
    if query.location_hint == LocationHint::RemoteOnly && !event.is_online {
        return false;
    }
    if query.free_only == Some(true) && event.is_free == Some(false) {
        return false;
    }
    true
}

/// Releases a HALF_OPEN probe if the call is dropped before its outcome is recorded
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl ProbeGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.abandon_probe();
        }
    }
}

pub struct DiscoveryEngine {
    primary: SourceBinding,
    secondary: SourceBinding,
    normalizer: EventNormalizer,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
}

impl DiscoveryEngine {
    pub fn new(
        primary: SourceBinding,
        secondary: SourceBinding,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            primary,
            secondary,
            normalizer: EventNormalizer::new(Arc::clone(&clock)).with_event_bus(event_bus.clone()),
            event_bus,
            clock,
        }
    }

    /// Bindings in call order
    pub fn bindings(&self) -> [&SourceBinding; 2] {
        [&self.primary, &self.secondary]
    }

    pub async fn discover(&self, query: &EventQuery) -> DiscoveryOutcome {
        self.discover_with_id(Uuid::new_v4(), query).await
    }

    /// Run discovery, tagging emitted events with `request_id`
    pub async fn discover_with_id(&self, request_id: Uuid, query: &EventQuery) -> DiscoveryOutcome {
        let mut outcome = DiscoveryOutcome::default();

        for binding in self.bindings() {
            let kind = binding.kind();
            match self.call_source(request_id, binding, query).await {
                SourceOutcome::Results(payload) => {
                    outcome.sources_used.push(kind);

                    let batch = self.normalizer.normalize(&payload);
                    outcome.record_errors.extend(batch.errors);
                    let usable: Vec<Event> = batch
                        .events
                        .into_iter()
                        .filter(|event| is_usable(query, event))
                        .collect();

                    if usable.is_empty() {
                        debug!(
                            source = %kind,
                            records = payload.len(),
                            "No usable results, falling back"
                        );
                        continue;
                    }

                    debug!(source = %kind, events = usable.len(), "Source returned usable results");
                    outcome.events = usable;
                    break;
                }
                SourceOutcome::Empty => {
                    debug!(source = %kind, "Source returned no results, falling back");
                    outcome.sources_used.push(kind);
                }
                SourceOutcome::Failed(err) => {
                    outcome.errors.push(err);
                }
                SourceOutcome::Skipped => {
                    outcome.errors.push(DiscoveryError::circuit_open(kind));
                }
            }
        }

        info!(
            request_id = %request_id,
            events = outcome.events.len(),
            sources_used = ?outcome.sources_used,
            errors = outcome.errors.len(),
            dropped_records = outcome.record_errors.len(),
            "Discovery finished"
        );

        outcome
    }

    /// One breaker-gated, retried call; exactly one breaker record per admitted call
    async fn call_source(
        &self,
        request_id: Uuid,
        binding: &SourceBinding,
        query: &EventQuery,
    ) -> SourceOutcome {
        let kind = binding.kind();
        let admission = binding.breaker.admit();
        self.publish_change(kind, admission.change);

        if !admission.allowed {
            info!(source = %kind, "Skipping source, circuit open");
            self.event_bus.emit_lossy(DiscoveryEvent::SourceSkipped {
                request_id,
                source: kind,
                timestamp: self.clock.now(),
            });
            return SourceOutcome::Skipped;
        }

        let mut probe_guard = ProbeGuard {
            breaker: &binding.breaker,
            armed: admission.probe,
        };

        let result = binding
            .retry
            .execute_paced(kind, || binding.source.ready(), || binding.source.fetch(query))
            .await;

        probe_guard.disarm();

        match result {
            Ok(payload) => {
                let change = binding.breaker.record_success();
                self.publish_change(kind, change);
                if payload.is_empty() {
                    SourceOutcome::Empty
                } else {
                    SourceOutcome::Results(payload)
                }
            }
            Err(err) => {
                let change = binding.breaker.record_failure();
                self.publish_change(kind, change);
                err.log();
                self.event_bus.emit_lossy(DiscoveryEvent::SourceCallFailed {
                    request_id,
                    source: kind,
                    category: err.category(),
                    message: err.to_string(),
                    timestamp: self.clock.now(),
                });
                SourceOutcome::Failed(err)
            }
        }
    }

    fn publish_change(&self, source: SourceKind, change: Option<StateChange>) {
        if let Some(StateChange { from, to }) = change {
            self.event_bus.emit_lossy(DiscoveryEvent::BreakerStateChanged {
                source,
                old_state: from,
                new_state: to,
                timestamp: self.clock.now(),
            });
        }
    }
}
