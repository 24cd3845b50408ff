use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};

/// SSE event name carrying `{ "progress": N }` payloads.
pub const PROGRESS_EVENT: &str = "uploadProgress";

#[utoipa::path(
    get,
    path = "/events",
    responses(
        (status = 200, description = "Server-sent stream of uploadProgress events", body = String, content_type = "text/event-stream")
    ),
    tag = "events"
)]
pub async fn progress_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    // The observer lives as long as the response stream; a disconnect drops both.
    let observer = state.hub.subscribe();
    let stream = observer
        .into_stream()
        .map(|event| Event::default().event(PROGRESS_EVENT).json_data(event));

    Sse::new(stream).keep_alive(KeepAlive::default())
}
