//! Raw payload → canonical [`Event`]s
//!
//! Records are mapped independently. A record missing a required field
//! (id, title, start) or failing type coercion is dropped with a warning;
//! its siblings are unaffected. Surviving records keep their input order.

use crate::models::{Event, RawPayload};
use crate::services::error_classifier::{DiscoveryError, ErrorClassifier};
use chrono::{DateTime, Duration, Utc};
use evmap_common::events::{DiscoveryEvent, EventBus, SourceKind};
use evmap_common::Clock;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Why a single record was dropped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has an unusable value: {detail}")]
    InvalidField { field: &'static str, detail: String },
}

/// Events that survived normalization plus one error per dropped record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub events: Vec<Event>,
    pub errors: Vec<DiscoveryError>,
}

#[derive(Clone)]
pub struct EventNormalizer {
    classifier: ErrorClassifier,
    event_bus: Option<EventBus>,
    clock: Arc<dyn Clock>,
}

impl EventNormalizer {
    /// `clock` stamps the `RecordDropped` events
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            classifier: ErrorClassifier::new(),
            event_bus: None,
            clock,
        }
    }

    /// Also publish a `RecordDropped` event for every dropped record
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Normalize one backend's payload
    pub fn normalize(&self, payload: &RawPayload) -> NormalizedBatch {
        let source = payload.source;
        let mut batch = NormalizedBatch::default();

        for (index, record) in payload.records.iter().enumerate() {
            let mapped = match source {
                SourceKind::Meetup => map_meetup(record),
                SourceKind::Eventbrite => map_eventbrite(record),
            };

            match mapped {
                Ok(event) => batch.events.push(event),
                Err(reason) => {
                    warn!(
                        source = %source,
                        record_index = index,
                        reason = %reason,
                        "Dropping malformed event record"
                    );
                    if let Some(bus) = &self.event_bus {
                        bus.emit_lossy(DiscoveryEvent::RecordDropped {
                            source,
                            record_index: index,
                            reason: reason.to_string(),
                            timestamp: self.clock.now(),
                        });
                    }
                    batch
                        .errors
                        .push(self.classifier.classify_record(source, index, &reason.to_string()));
                }
            }
        }

        batch
    }

}

impl std::fmt::Debug for EventNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventNormalizer")
            .field("publishes_drops", &self.event_bus.is_some())
            .finish()
    }
}

/// Meetup REST record
///
/// `fee` absent is read as free, matching how Meetup omits it for free events.
pub fn map_meetup(record: &Value) -> Result<Event, RecordError> {
    let obj = record.as_object().ok_or(RecordError::NotAnObject)?;

    let native_id = native_id(obj.get("id"))?;
    let title = required_text(obj.get("name"), "name")?;

    let millis = match obj.get("time") {
        None | Some(Value::Null) => return Err(RecordError::MissingField("time")),
        Some(value) => value.as_i64().ok_or_else(|| RecordError::InvalidField {
            field: "time",
            detail: format!("expected epoch milliseconds, found {}", value),
        })?,
    };
    let start = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        RecordError::InvalidField {
            field: "time",
            detail: format!("{} is out of range", millis),
        }
    })?;

    let end = obj
        .get("duration")
        .and_then(Value::as_i64)
        .filter(|ms| *ms > 0)
        .and_then(|ms| start.checked_add_signed(Duration::milliseconds(ms)));

    let venue_online = obj
        .get("venue")
        .and_then(|venue| venue.get("id"))
        .and_then(Value::as_i64)
        == Some(1);
    let is_online = obj
        .get("is_online_event")
        .and_then(Value::as_bool)
        .unwrap_or(false)
        || venue_online;

    let is_free = match obj.get("fee") {
        None | Some(Value::Null) => Some(true),
        Some(fee) => fee.get("amount").and_then(Value::as_f64).map(|amount| amount <= 0.0),
    };

    Ok(Event {
        id: Event::qualified_id(SourceKind::Meetup, &native_id),
        title,
        description: optional_text(obj.get("description")),
        start,
        end,
        url: optional_text(obj.get("link")),
        is_online,
        is_free,
        source: SourceKind::Meetup,
    })
}

/// Eventbrite v3 record
pub fn map_eventbrite(record: &Value) -> Result<Event, RecordError> {
    let obj = record.as_object().ok_or(RecordError::NotAnObject)?;

    let native_id = native_id(obj.get("id"))?;
    let title = required_text(obj.get("name").and_then(|name| name.get("text")), "name.text")?;

    let start_raw = obj
        .get("start")
        .and_then(|start| start.get("utc"))
        .and_then(Value::as_str)
        .ok_or(RecordError::MissingField("start.utc"))?;
    let start = parse_rfc3339(start_raw, "start.utc")?;

    // An unparseable end is dropped, not the whole record
    let end = obj
        .get("end")
        .and_then(|end| end.get("utc"))
        .and_then(Value::as_str)
        .and_then(|raw| parse_rfc3339(raw, "end.utc").ok());

    Ok(Event {
        id: Event::qualified_id(SourceKind::Eventbrite, &native_id),
        title,
        description: optional_text(obj.get("description").and_then(|d| d.get("text"))),
        start,
        end,
        url: optional_text(obj.get("url")),
        is_online: obj.get("online_event").and_then(Value::as_bool).unwrap_or(false),
        is_free: obj.get("is_free").and_then(Value::as_bool),
        source: SourceKind::Eventbrite,
    })
}

/// Ids arrive as strings or numbers depending on the API version
fn native_id(value: Option<&Value>) -> Result<String, RecordError> {
    match value {
        None | Some(Value::Null) => Err(RecordError::MissingField("id")),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(RecordError::MissingField("id")),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(RecordError::InvalidField {
            field: "id",
            detail: format!("expected string or number, found {}", other),
        }),
    }
}

/// Blank counts as missing
fn required_text(value: Option<&Value>, field: &'static str) -> Result<String, RecordError> {
    match value {
        None | Some(Value::Null) => Err(RecordError::MissingField(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(RecordError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(other) => Err(RecordError::InvalidField {
            field,
            detail: format!("expected string, found {}", other),
        }),
    }
}

fn optional_text(value: Option<&Value>) -> String {
    value.and_then(Value::as_str).unwrap_or_default().trim().to_string()
}

fn parse_rfc3339(raw: &str, field: &'static str) -> Result<DateTime<Utc>, RecordError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RecordError::InvalidField {
            field,
            detail: format!("{:?} is not RFC 3339: {}", raw, e),
        })
}
