//! Discovery pipeline services

pub mod circuit_breaker;
pub mod discovery_engine;
pub mod discovery_service;
pub mod error_classifier;
pub mod event_normalizer;
pub mod prompt_augmenter;
pub mod query_extractor;
pub mod retry_policy;
pub mod topic_vocabulary;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, StateChange};
pub use discovery_engine::{DiscoveryEngine, DiscoveryOutcome, SourceBinding, SourceOutcome};
pub use discovery_service::{DiscoveryService, SearchResponse, SearchStatus, StatusReport};
pub use error_classifier::{DiscoveryError, ErrorClassifier, ErrorReport, SourceError};
pub use event_normalizer::{EventNormalizer, NormalizedBatch};
pub use prompt_augmenter::PromptAugmenter;
pub use query_extractor::QueryExtractor;
pub use retry_policy::RetryPolicy;
