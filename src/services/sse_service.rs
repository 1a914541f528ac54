use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use crate::{
    dto::events::ServerEvent,
    state::{SharedState, broadcast::EVENT_SNAPSHOT},
};

/// Identifies the target SSE stream, for logging once the client goes away.
#[derive(Clone, Copy, Debug)]
pub enum StreamKind {
    /// Display-class stream.
    Public,
    /// Moderator-class stream.
    Admin,
}

/// Subscribe to the display-class stream, starting with a public snapshot.
pub async fn subscribe_public(
    state: &SharedState,
) -> (broadcast::Receiver<ServerEvent>, Option<ServerEvent>) {
    subscribe(state, StreamKind::Public).await
}

/// Subscribe to the moderator-class stream, starting with a full snapshot.
pub async fn subscribe_admin(
    state: &SharedState,
) -> (broadcast::Receiver<ServerEvent>, Option<ServerEvent>) {
    subscribe(state, StreamKind::Admin).await
}

/// Subscribe while holding the engine lock so no event slips between the
/// snapshot and the first live event.
async fn subscribe(
    state: &SharedState,
    kind: StreamKind,
) -> (broadcast::Receiver<ServerEvent>, Option<ServerEvent>) {
    let engine = state.engine().await;
    let (receiver, moderator) = match kind {
        StreamKind::Public => (state.public_sse().subscribe(), false),
        StreamKind::Admin => (state.admin_sse().subscribe(), true),
    };
    let snapshot = match ServerEvent::json(EVENT_SNAPSHOT, &engine.snapshot(moderator)) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to serialise SSE snapshot");
            None
        }
    };
    (receiver, snapshot)
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    initial: Option<ServerEvent>,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        if let Some(payload) = initial {
            if tx.send(Ok(to_event(&payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(&payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Skip lagged messages but keep the stream alive.
                            warn!(?kind, skipped, "SSE subscriber lagging behind");
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!(?kind, "SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: &ServerEvent) -> Event {
    Event::default()
        .event(payload.event.as_str())
        .data(payload.data.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, dao::question_bank::QuestionBank, state::AppState};

    #[tokio::test]
    async fn subscribers_start_from_a_snapshot() {
        let state = AppState::new(AppConfig::default(), QuestionBank::default());

        let (_public, snapshot) = subscribe_public(&state).await;
        let snapshot = snapshot.unwrap();
        assert_eq!(snapshot.event, EVENT_SNAPSHOT);
        assert!(snapshot.data.get("moderator").is_none());
        assert_eq!(state.public_sse().subscribers(), 1);

        let (_admin, snapshot) = subscribe_admin(&state).await;
        assert!(snapshot.unwrap().data.get("moderator").is_some());
        assert_eq!(state.admin_sse().subscribers(), 1);
    }
}
