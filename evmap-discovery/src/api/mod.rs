//! HTTP API handlers
//!
//! Tool-style invocation surface for an orchestrating agent, plus the
//! status/config resources, health and the discovery event stream.

pub mod health;
pub mod sse;
pub mod status;
pub mod tools;

pub use health::health_routes;
pub use sse::event_stream;
pub use status::status_routes;
pub use tools::tool_routes;
