//! # evmap Common Library
//!
//! Shared code for the evmap services including:
//! - Error and result types
//! - Bootstrap configuration loading (TOML + environment)
//! - Discovery event types and the EventBus
//! - Clock abstraction used by time-dependent resilience logic
//! - Server-Sent Events helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use time::{Clock, ManualClock, SystemClock};
