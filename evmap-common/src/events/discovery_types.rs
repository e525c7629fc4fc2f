//! Shared discovery enums
//!
//! Used by the event payloads below and by the discovery service's
//! breaker, classifier and normalizer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// External event-search backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Meetup REST API (primary)
    Meetup,
    /// Eventbrite REST API (secondary)
    Eventbrite,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Meetup => "meetup",
            SourceKind::Eventbrite => "eventbrite",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation, calls pass through
    Closed,
    /// Failure threshold exceeded, calls fast-fail
    Open,
    /// Cooldown elapsed, a single probe call is admitted
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        };
        f.write_str(s)
    }
}

/// Closed failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    AuthenticationError,
    TransientApiError,
    PermanentApiError,
    DataProcessingError,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::AuthenticationError => "AuthenticationError",
            ErrorCategory::TransientApiError => "TransientApiError",
            ErrorCategory::PermanentApiError => "PermanentApiError",
            ErrorCategory::DataProcessingError => "DataProcessingError",
        };
        f.write_str(s)
    }
}
