//! Server-Sent Events support

use crate::stream::WireEvent;
use axum::http::header::{HeaderName, CACHE_CONTROL};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream::Stream;
use futures::StreamExt;
use std::convert::Infallible;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Stream wire events as `data: <json>` frames with caching and proxy
/// buffering disabled
pub fn sse_response<S>(events: S) -> Response
where
    S: Stream<Item = WireEvent> + Send + 'static,
{
    let frames = events.map(|event| Ok::<_, Infallible>(wire_event_to_axum(&event)));

    (
        [
            (CACHE_CONTROL, "no-cache, no-store, no-transform"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        Sse::new(frames),
    )
        .into_response()
}

fn wire_event_to_axum(event: &WireEvent) -> Event {
    tracing::trace!(kind = event.kind(), "Sending frame");
    Event::default().data(event.to_json().to_string())
}
