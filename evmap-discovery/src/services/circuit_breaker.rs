//! Per-source circuit breaker
//!
//! One breaker per backend, constructed at startup and injected into the
//! discovery engine. State lives behind a mutex so concurrent discovery
//! requests serialize their transitions.
//!
//! Transitions:
//! - CLOSED → OPEN when `consecutive_failures >= failure_threshold`
//! - OPEN → HALF_OPEN once `recovery_timeout` has elapsed since `opened_at`
//! - HALF_OPEN → CLOSED on the probe's success
//! - HALF_OPEN → OPEN on the probe's failure (`opened_at` reset)
//!
//! A probe whose outcome is never recorded (its caller was cancelled) is
//! released by [`CircuitBreaker::abandon_probe`]; failing that, it goes stale
//! after `recovery_timeout` and the next caller becomes the probe.

use chrono::{DateTime, Utc};
use evmap_common::config::SourceConfig;
use evmap_common::events::{CircuitState, SourceKind};
use evmap_common::time::to_chrono;
use evmap_common::Clock;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Breaker thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
}

impl From<&SourceConfig> for CircuitBreakerConfig {
    fn from(config: &SourceConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            recovery_timeout: config.recovery_timeout(),
        }
    }
}

/// A state transition caused by one breaker operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: CircuitState,
    pub to: CircuitState,
}

/// Result of asking the breaker for permission to call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    /// This call is the HALF_OPEN probe
    pub probe: bool,
    /// Set when the request itself moved OPEN → HALF_OPEN
    pub change: Option<StateChange>,
}

impl Admission {
    fn refused() -> Self {
        Self {
            allowed: false,
            probe: false,
            change: None,
        }
    }
}

/// Point-in-time view for status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub opened_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<DateTime<Utc>>,
    /// HALF_OPEN admits a single probe until its outcome is recorded
    probe_in_flight: bool,
    probe_started_at: Option<DateTime<Utc>>,
}

pub struct CircuitBreaker {
    source: SourceKind,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(source: SourceKind, config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            config,
            clock,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
                probe_started_at: None,
            }),
        }
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn config(&self) -> CircuitBreakerConfig {
        self.config
    }

    /// True in CLOSED and (for one probe) HALF_OPEN, false in OPEN
    pub fn allow_call(&self) -> bool {
        self.admit().allowed
    }

    /// [`Self::allow_call`] plus the lazy OPEN → HALF_OPEN transition, if it happened
    pub fn admit(&self) -> Admission {
        let now = self.clock.now();
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed => Admission {
                allowed: true,
                probe: false,
                change: None,
            },
            CircuitState::Open => {
                if self.cooldown_elapsed(&inner, now) {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    inner.probe_started_at = Some(now);
                    info!(
                        source = %self.source,
                        "Circuit breaker half-open, admitting probe call"
                    );
                    Admission {
                        allowed: true,
                        probe: true,
                        change: Some(StateChange {
                            from: CircuitState::Open,
                            to: CircuitState::HalfOpen,
                        }),
                    }
                } else {
                    debug!(source = %self.source, "Circuit open, refusing call");
                    Admission::refused()
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight && !self.probe_stale(&inner, now) {
                    debug!(source = %self.source, "Probe already in flight, refusing call");
                    return Admission::refused();
                }
                if inner.probe_in_flight {
                    warn!(
                        source = %self.source,
                        "Probe outcome never recorded, admitting a new probe"
                    );
                }
                inner.probe_in_flight = true;
                inner.probe_started_at = Some(now);
                Admission {
                    allowed: true,
                    probe: true,
                    change: None,
                }
            }
        }
    }

    /// Record a successful call; resets the failure counter and closes the circuit
    pub fn record_success(&self) -> Option<StateChange> {
        let mut inner = self.lock();
        let from = inner.state;

        inner.consecutive_failures = 0;
        inner.probe_in_flight = false;
        inner.probe_started_at = None;
        inner.opened_at = None;
        inner.state = CircuitState::Closed;

        if from != CircuitState::Closed {
            info!(source = %self.source, from = %from, "Circuit breaker closed");
            Some(StateChange {
                from,
                to: CircuitState::Closed,
            })
        } else {
            None
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) -> Option<StateChange> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let from = inner.state;

        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.probe_in_flight = false;
        inner.probe_started_at = None;

        let should_open = match from {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };

        if should_open {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(now);
            warn!(
                source = %self.source,
                consecutive_failures = inner.consecutive_failures,
                recovery_timeout_secs = self.config.recovery_timeout.as_secs(),
                "Circuit breaker opened"
            );
            Some(StateChange {
                from,
                to: CircuitState::Open,
            })
        } else {
            None
        }
    }

    /// Release a HALF_OPEN probe whose caller went away without an outcome
    ///
    /// Counts neither as success nor as failure; the next caller is admitted
    /// as the probe.
    pub fn abandon_probe(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen && inner.probe_in_flight {
            inner.probe_in_flight = false;
            inner.probe_started_at = None;
            debug!(source = %self.source, "Probe abandoned before completion");
        }
    }

    /// Effective state, without mutating
    ///
    /// Reports HALF_OPEN once the cooldown has elapsed even if no call has
    /// triggered the transition yet.
    pub fn state(&self) -> CircuitState {
        self.snapshot().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = self.clock.now();
        let inner = self.lock();
        let state = match inner.state {
            CircuitState::Open if self.cooldown_elapsed(&inner, now) => CircuitState::HalfOpen,
            other => other,
        };
        BreakerSnapshot {
            state,
            consecutive_failures: inner.consecutive_failures,
            opened_at: inner.opened_at,
        }
    }

    fn cooldown_elapsed(&self, inner: &BreakerState, now: DateTime<Utc>) -> bool {
        match inner.opened_at {
            Some(opened_at) => now.signed_duration_since(opened_at) >= to_chrono(self.config.recovery_timeout),
            None => true,
        }
    }

    fn probe_stale(&self, inner: &BreakerState, now: DateTime<Utc>) -> bool {
        match inner.probe_started_at {
            Some(started) => now.signed_duration_since(started) >= to_chrono(self.config.recovery_timeout),
            None => true,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("source", &self.source)
            .field("config", &self.config)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
