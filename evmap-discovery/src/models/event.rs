//! Canonical event model and raw per-source payloads

use chrono::{DateTime, Utc};
use evmap_common::events::SourceKind;
use serde::{Deserialize, Serialize};

/// Canonical event, produced by the normalizer
///
/// `source` is kept so a consumer can reconcile duplicates across
/// backends; discovery itself never deduplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Source-qualified identifier, e.g. `meetup:12345`
    pub id: String,
    pub title: String,
    /// May be empty
    pub description: String,
    pub start: DateTime<Utc>,
    /// Absent for open-ended events
    pub end: Option<DateTime<Utc>>,
    /// May be empty
    pub url: String,
    pub is_online: bool,
    /// `None` when the backend does not say
    pub is_free: Option<bool>,
    pub source: SourceKind,
}

impl Event {
    /// Build the source-qualified id
    pub fn qualified_id(source: SourceKind, native_id: &str) -> String {
        format!("{}:{}", source, native_id)
    }
}

/// Records exactly as one backend returned them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPayload {
    pub source: SourceKind,
    pub records: Vec<serde_json::Value>,
}

impl RawPayload {
    pub fn new(source: SourceKind, records: Vec<serde_json::Value>) -> Self {
        Self { source, records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
