//! Server-Sent Events stream of run lifecycle events.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use mailflow_app::ports::{EventStore, Ports};

use crate::state::AppState;

/// `GET /api/events/stream` — live `automation.*` events.
///
/// Each event is one SSE frame named after its type, with the JSON-encoded
/// event as `data`. A listener that falls behind the bus skips the
/// overwritten events and keeps streaming.
pub async fn stream<P, ES>(
    State(state): State<AppState<P, ES>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let event_rx = state.event_bus.subscribe();
    let event_stream = BroadcastStream::new(event_rx).filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(Event::default()
                .event(event.event_type.as_str())
                .data(json))),
            Err(err) => {
                tracing::warn!(%err, "failed to encode event for SSE stream");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "SSE listener lagged, events dropped");
            None
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
