//! Structured query extracted from free text
//!
//! Every field is either a validated value or explicitly unspecified
//! (`None` / `Unconstrained`); no sentinel values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::num::NonZeroU32;

/// Half-open interval `[start, end)` with `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Returns `None` unless `start < end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Non-blank place name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceName(String);

impl PlaceName {
    /// Trims the input; returns `None` if nothing remains
    pub fn new(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Where the caller wants events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "place", rename_all = "snake_case")]
pub enum LocationHint {
    /// Proximity to the caller; resolved downstream, not geocoded here
    NearMe,
    NamedPlace(PlaceName),
    RemoteOnly,
    Unconstrained,
}

/// Immutable intent record produced by the query extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQuery {
    pub time_window: Option<TimeWindow>,
    pub location_hint: LocationHint,
    /// Normalized topic keywords, possibly empty
    pub topics: BTreeSet<String>,
    /// `Some(true)` when remote/online was requested, `None` when unspecified
    pub remote_allowed: Option<bool>,
    /// `Some(true)` when free/no-cost was requested, `None` when unspecified
    pub free_only: Option<bool>,
    pub max_results: NonZeroU32,
}

impl EventQuery {
    /// A query with every field unspecified
    pub fn unconstrained(max_results: NonZeroU32) -> Self {
        Self {
            time_window: None,
            location_hint: LocationHint::Unconstrained,
            topics: BTreeSet::new(),
            remote_allowed: None,
            free_only: None,
            max_results,
        }
    }

    /// Copy of this query with a different result cap
    pub fn with_max_results(mut self, max_results: NonZeroU32) -> Self {
        self.max_results = max_results;
        self
    }

    /// Named place, if the hint is one
    pub fn place(&self) -> Option<&str> {
        match &self.location_hint {
            LocationHint::NamedPlace(place) => Some(place.as_str()),
            _ => None,
        }
    }

    /// Topics joined with spaces, for backends taking a free-text filter
    pub fn topic_text(&self) -> Option<String> {
        if self.topics.is_empty() {
            None
        } else {
            Some(self.topics.iter().cloned().collect::<Vec<_>>().join(" "))
        }
    }
}
