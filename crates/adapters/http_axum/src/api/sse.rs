//! Server-Sent Events (SSE) stream of execution progress.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use hookflow_app::ports::{AutomationRepository, ExecutionRecorder, HttpClient, WebhookRepository};

use crate::state::AppState;

/// `GET /api/executions/stream`
///
/// Subscribes to the event bus broadcast channel and sends each event as a
/// JSON `data:` frame named after its kind (`started`, `step_recorded`,
/// `finished`). The stream continues until the client disconnects or the
/// event bus is closed.
pub async fn stream<AR, WR, ER, H>(
    State(state): State<AppState<AR, WR, ER, H>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    AR: AutomationRepository + Send + Sync + 'static,
    WR: WebhookRepository + Send + Sync + 'static,
    ER: ExecutionRecorder + Send + Sync + 'static,
    H: HttpClient + Send + Sync + 'static,
{
    let event_rx = state.event_bus.subscribe();
    let event_stream = BroadcastStream::new(event_rx).filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(Event::default().event(event.name()).data(json))),
            Err(err) => {
                tracing::warn!(%err, "failed to serialize execution event for SSE stream");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(
                skipped = n,
                "SSE subscriber lagged, some events were dropped"
            );
            None
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
