//! Value types flowing through the discovery pipeline

pub mod event;
pub mod query;

pub use event::{Event, RawPayload};
pub use query::{EventQuery, LocationHint, PlaceName, TimeWindow};
