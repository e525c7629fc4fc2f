//! Server-Sent Events for discovery activity

use crate::{AppState, MODULE_NAME};
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /events - SSE stream of discovery events
///
/// Streams DiscoveryStarted, SourceCallFailed, SourceSkipped,
/// BreakerStateChanged, RecordDropped and DiscoveryCompleted.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    evmap_common::sse::create_event_sse_stream(&state.event_bus, MODULE_NAME)
}
