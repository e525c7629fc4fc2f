//! Failure taxonomy and classification
//!
//! Raw backend failures ([`SourceError`]) are mapped onto the closed
//! four-way taxonomy ([`DiscoveryError`]). Only transient errors are
//! retried; authentication errors carry the setup step the operator must
//! take.

use evmap_common::events::{ErrorCategory, SourceKind};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Raw failure reported by a backend client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            SourceError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

/// Classified discovery failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// Bad or missing credentials; never retried
    #[error("Authentication failed for {backend}: {message}. {hint}")]
    Authentication {
        backend: SourceKind,
        message: String,
        /// Actionable setup step
        hint: String,
    },

    /// Timeouts, rate limits, 5xx, open circuits; retried
    #[error("Transient API error from {backend}: {message}")]
    TransientApi {
        backend: SourceKind,
        message: String,
        status: Option<u16>,
    },

    /// Client errors that will not succeed on retry
    #[error("Permanent API error from {backend}: {message}")]
    PermanentApi {
        backend: SourceKind,
        message: String,
        status: Option<u16>,
    },

    /// Unusable payload or record
    #[error("Data processing error from {backend}: {message}")]
    DataProcessing { backend: SourceKind, message: String },
}

/// Serializable view of a [`DiscoveryError`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub category: ErrorCategory,
    pub source: SourceKind,
    pub message: String,
}

impl DiscoveryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DiscoveryError::Authentication { .. } => ErrorCategory::AuthenticationError,
            DiscoveryError::TransientApi { .. } => ErrorCategory::TransientApiError,
            DiscoveryError::PermanentApi { .. } => ErrorCategory::PermanentApiError,
            DiscoveryError::DataProcessing { .. } => ErrorCategory::DataProcessingError,
        }
    }

    pub fn backend(&self) -> SourceKind {
        match self {
            DiscoveryError::Authentication { backend, .. }
            | DiscoveryError::TransientApi { backend, .. }
            | DiscoveryError::PermanentApi { backend, .. }
            | DiscoveryError::DataProcessing { backend, .. } => *backend,
        }
    }

    /// Only transient errors are eligible for retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, DiscoveryError::TransientApi { .. })
    }

    /// Error reported for a source whose breaker refused the call
    pub fn circuit_open(backend: SourceKind) -> Self {
        DiscoveryError::TransientApi {
            backend,
            message: "circuit open, call not attempted".to_string(),
            status: None,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            category: self.category(),
            source: self.backend(),
            message: self.to_string(),
        }
    }

    /// Log at the level the taxonomy prescribes
    pub fn log(&self) {
        let source = self.backend();
        match self {
            DiscoveryError::Authentication { .. } | DiscoveryError::PermanentApi { .. } => {
                error!(source = %source, category = %self.category(), "{}", self);
            }
            DiscoveryError::TransientApi { .. } | DiscoveryError::DataProcessing { .. } => {
                warn!(source = %source, category = %self.category(), "{}", self);
            }
        }
    }
}

/// Maps raw failures from any layer onto [`DiscoveryError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a backend failure
    pub fn classify(&self, backend: SourceKind, err: &SourceError) -> DiscoveryError {
        match err {
            SourceError::MissingCredential(message) => DiscoveryError::Authentication {
                backend,
                message: message.clone(),
                hint: setup_hint(backend).to_string(),
            },
            SourceError::Http { status, body } => classify_status(backend, *status, body),
            SourceError::Network(message) | SourceError::Timeout(message) => {
                DiscoveryError::TransientApi {
                    backend,
                    message: message.clone(),
                    status: None,
                }
            }
            SourceError::Parse(message) => DiscoveryError::DataProcessing {
                backend,
                message: message.clone(),
            },
        }
    }

    /// Classify a single record the normalizer could not use
    pub fn classify_record(&self, backend: SourceKind, index: usize, reason: &str) -> DiscoveryError {
        DiscoveryError::DataProcessing {
            backend,
            message: format!("record {} dropped: {}", index, reason),
        }
    }
}

fn classify_status(backend: SourceKind, status: u16, body: &str) -> DiscoveryError {
    let message = format!("HTTP {}: {}", status, body);
    match status {
        401 | 403 => DiscoveryError::Authentication {
            backend,
            message,
            hint: setup_hint(backend).to_string(),
        },
        408 | 429 | 500..=599 => DiscoveryError::TransientApi {
            backend,
            message,
            status: Some(status),
        },
        _ => DiscoveryError::PermanentApi {
            backend,
            message,
            status: Some(status),
        },
    }
}

/// Setup step named in authentication errors
pub fn setup_hint(backend: SourceKind) -> &'static str {
    match backend {
        SourceKind::Meetup => {
            "Open the URL from get_auth_setup_url, authorize the application, \
             then set EVMAP_MEETUP_ACCESS_TOKEN"
        }
        SourceKind::Eventbrite => {
            "Create a private token at https://www.eventbrite.com/platform/api-keys \
             and set EVMAP_EVENTBRITE_TOKEN"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> SourceError {
        SourceError::Http {
            status,
            body: "body".to_string(),
        }
    }

    #[test]
    fn test_auth_statuses() {
        let classifier = ErrorClassifier::new();
        for status in [401, 403] {
            let err = classifier.classify(SourceKind::Meetup, &http(status));
            assert_eq!(err.category(), ErrorCategory::AuthenticationError);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_rate_limit_and_server_errors_are_transient() {
        let classifier = ErrorClassifier::new();
        for status in [408, 429, 500, 502, 503, 599] {
            let err = classifier.classify(SourceKind::Eventbrite, &http(status));
            assert_eq!(err.category(), ErrorCategory::TransientApiError, "status {}", status);
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn test_other_client_errors_are_permanent() {
        let classifier = ErrorClassifier::new();
        for status in [400, 404, 410, 422] {
            let err = classifier.classify(SourceKind::Meetup, &http(status));
            assert_eq!(err.category(), ErrorCategory::PermanentApiError, "status {}", status);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_network_and_timeout_are_transient() {
        let classifier = ErrorClassifier::new();
        let net = classifier.classify(SourceKind::Meetup, &SourceError::Network("reset".into()));
        let timeout = classifier.classify(SourceKind::Meetup, &SourceError::Timeout("10s".into()));
        assert!(net.is_retryable());
        assert!(timeout.is_retryable());
    }

    #[test]
    fn test_missing_credential_names_setup_step() {
        let classifier = ErrorClassifier::new();
        let err = classifier.classify(
            SourceKind::Meetup,
            &SourceError::MissingCredential("no access token".into()),
        );
        assert_eq!(err.category(), ErrorCategory::AuthenticationError);
        assert!(err.to_string().contains("get_auth_setup_url"));
        assert!(err.to_string().contains("EVMAP_MEETUP_ACCESS_TOKEN"));
    }

    #[test]
    fn test_parse_is_data_processing() {
        let classifier = ErrorClassifier::new();
        let err = classifier.classify(SourceKind::Eventbrite, &SourceError::Parse("eof".into()));
        assert_eq!(err.category(), ErrorCategory::DataProcessingError);
        assert_eq!(err.backend(), SourceKind::Eventbrite);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_circuit_open_is_transient() {
        let err = DiscoveryError::circuit_open(SourceKind::Meetup);
        assert_eq!(err.category(), ErrorCategory::TransientApiError);

        let report = err.report();
        assert_eq!(report.source, SourceKind::Meetup);
        assert!(report.message.contains("circuit open"));
    }
}
