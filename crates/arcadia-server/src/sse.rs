use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::error::AppError;
use crate::frame_channel::FrameCommand;
use crate::state::{AppState, ConnectionGuard};

fn frame_event(command: &FrameCommand) -> Option<SseEvent> {
    match SseEvent::default().event("frame").json_data(command) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!("Failed to encode frame command: {e}");
            None
        },
    }
}

/// GET /api/v1/sessions/{session_id}/stream: frame commands for the iframe
/// hosting this session.
///
/// The first event brings a fresh page up to date with the current target.
/// Attaching is what makes the session's context ready for messages.
pub async fn frame_stream(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, AppError> {
    let max = state.config.limits.max_stream_subscribers;
    let current = state.stream_subscriber_count.load(Ordering::Relaxed);
    if current >= max {
        tracing::warn!(current, max, "Frame stream subscriber limit reached");
        return Err(AppError::ServiceUnavailable(
            "Too many open streams".to_string(),
        ));
    }

    let (initial, rx) = state.sessions.write().await.subscribe(&session_id)?;
    let guard = ConnectionGuard::new(Arc::clone(&state.stream_subscriber_count));
    tracing::debug!(session = %session_id, "Frame stream attached");

    let first = tokio_stream::iter(frame_event(&initial).map(Ok));
    let updates = BroadcastStream::new(rx).filter_map(move |result| {
        let _guard = &guard;
        match result {
            Ok(command) => frame_event(&command).map(Ok),
            Err(e) => {
                tracing::warn!(session = %session_id, "Frame stream lagged: {e}");
                None
            },
        }
    });

    Ok(Sse::new(first.chain(updates)).keep_alive(KeepAlive::default()))
}
