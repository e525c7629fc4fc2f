//! Event types for the evmap event system
//!
//! Provides the discovery event definitions and the EventBus that carries
//! them from the discovery pipeline to SSE subscribers.

mod discovery_types;

pub use discovery_types::{CircuitState, ErrorCategory, SourceKind};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Discovery pipeline events
///
/// Every classified failure and every breaker transition is published here
/// in addition to being logged. Serialized with a `type` tag for SSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DiscoveryEvent {
    /// A discovery request started
    DiscoveryStarted {
        request_id: Uuid,
        /// Raw text the query was extracted from
        query: String,
        timestamp: DateTime<Utc>,
    },

    /// A source call failed after retries (or without any, if not retryable)
    SourceCallFailed {
        request_id: Uuid,
        source: SourceKind,
        category: ErrorCategory,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A source was not called because its breaker is open
    SourceSkipped {
        request_id: Uuid,
        source: SourceKind,
        timestamp: DateTime<Utc>,
    },

    /// A breaker changed state
    BreakerStateChanged {
        source: SourceKind,
        old_state: CircuitState,
        new_state: CircuitState,
        timestamp: DateTime<Utc>,
    },

    /// The normalizer dropped a malformed record
    RecordDropped {
        source: SourceKind,
        /// Position of the record in the raw payload
        record_index: usize,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A discovery request finished (successfully or not)
    DiscoveryCompleted {
        request_id: Uuid,
        event_count: usize,
        sources_used: Vec<SourceKind>,
        error_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl DiscoveryEvent {
    /// Event type name, used as the SSE event field
    pub fn event_type(&self) -> &'static str {
        match self {
            DiscoveryEvent::DiscoveryStarted { .. } => "DiscoveryStarted",
            DiscoveryEvent::SourceCallFailed { .. } => "SourceCallFailed",
            DiscoveryEvent::SourceSkipped { .. } => "SourceSkipped",
            DiscoveryEvent::BreakerStateChanged { .. } => "BreakerStateChanged",
            DiscoveryEvent::RecordDropped { .. } => "RecordDropped",
            DiscoveryEvent::DiscoveryCompleted { .. } => "DiscoveryCompleted",
        }
    }
}

/// Broadcast bus for [`DiscoveryEvent`]s
///
/// Cloning is cheap; all clones share the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DiscoveryEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///
    /// # Examples
    ///
    /// ```
    /// use evmap_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: DiscoveryEvent,
    ) -> Result<usize, broadcast::error::SendError<DiscoveryEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Discovery never depends on anyone listening, so the pipeline uses this.
    pub fn emit_lossy(&self, event: DiscoveryEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = DiscoveryEvent::BreakerStateChanged {
            source: SourceKind::Meetup,
            old_state: CircuitState::Closed,
            new_state: CircuitState::Open,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "BreakerStateChanged");
        assert_eq!(json["source"], "meetup");
        assert_eq!(json["new_state"], "OPEN");
        assert_eq!(event.event_type(), "BreakerStateChanged");
    }

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(10);
        let result = bus.emit(DiscoveryEvent::SourceSkipped {
            request_id: Uuid::new_v4(),
            source: SourceKind::Eventbrite,
            timestamp: Utc::now(),
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let request_id = Uuid::new_v4();
        bus.emit_lossy(DiscoveryEvent::DiscoveryCompleted {
            request_id,
            event_count: 3,
            sources_used: vec![SourceKind::Meetup],
            error_count: 0,
            timestamp: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            DiscoveryEvent::DiscoveryCompleted { request_id: id, event_count, .. } => {
                assert_eq!(id, request_id);
                assert_eq!(event_count, 3);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
