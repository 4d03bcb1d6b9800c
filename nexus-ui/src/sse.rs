//! Server-Sent Events stream of session changes.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::broadcast;
use tracing::warn;

use nexus::engine::SessionEvent;

use crate::state::AppState;

/// SSE endpoint handler.
///
/// Events carry no session data; clients refetch the matching `/api`
/// resource when they see one.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.engine.subscribe();
    Sse::new(event_stream(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn event_stream(
    mut rx: broadcast::Receiver<SessionEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(sse) = to_sse(event) {
                        yield Ok(sse);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "SSE client lagged, some events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    }
}

fn to_sse(event: SessionEvent) -> Option<Event> {
    let data = serde_json::to_string(&event).ok()?;
    Some(Event::default().event(event.name()).data(data))
}
