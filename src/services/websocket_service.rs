use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::ClientMessage,
    state::{SharedState, engine::Caller, registry::ConnectionId},
};

const REGISTER_TIMEOUT: Duration = Duration::from_secs(10);

/// Why an inbound frame could not be turned into an action.
#[derive(Debug, Error)]
enum InboundError {
    /// Frame is not a JSON object with a known shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The first frame of a connection must declare its role.
    #[error("first message must be `register`, got `{0}`")]
    NotRegister(&'static str),
}

/// Handle the full lifecycle of one client WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(REGISTER_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket registration timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let register = match parse_register(initial_message.as_str()) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "closing unregistered websocket");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let connection_id: ConnectionId = Uuid::new_v4();
    // The writer must be known before registering so the `registered` reply reaches it.
    state.sockets().insert(connection_id, outbound_tx.clone());

    if !state.apply(Caller::Connection(connection_id), register).await {
        warn!(connection = %connection_id, "registration refused");
        let _ = outbound_tx.send(Message::Close(None));
        state.disconnect(connection_id).await;
        finalize(writer_task, outbound_tx).await;
        return;
    }

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match parse_message(text.as_str()) {
                Ok(ClientMessage::Unknown) => {
                    warn!(connection = %connection_id, payload = %text, "ignoring unknown message type");
                }
                Ok(action) => {
                    state.apply(Caller::Connection(connection_id), action).await;
                }
                Err(err) => {
                    warn!(connection = %connection_id, error = %err, "failed to parse client message");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(connection = %connection_id, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection = %connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.disconnect(connection_id).await;
    finalize(writer_task, outbound_tx).await;
}

fn parse_message(text: &str) -> Result<ClientMessage, InboundError> {
    Ok(serde_json::from_str(text)?)
}

/// Parse the first frame of a connection, which must be a `register`.
fn parse_register(text: &str) -> Result<ClientMessage, InboundError> {
    match parse_message(text)? {
        message @ ClientMessage::Register { .. } => Ok(message),
        other => Err(InboundError::NotRegister(other.name())),
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::registry::Role;

    #[test]
    fn first_frame_must_register() {
        let message = parse_register(r#"{"type":"register","role":"display"}"#).unwrap();
        assert!(matches!(
            message,
            ClientMessage::Register {
                role: Role::Display,
                ..
            }
        ));

        let err = parse_register(r#"{"type":"buzz"}"#).unwrap_err();
        assert!(matches!(err, InboundError::NotRegister("buzz")));
    }

    #[test]
    fn undecodable_frames_are_reported() {
        assert!(matches!(
            parse_message("not json"),
            Err(InboundError::Malformed(_))
        ));
        assert!(matches!(
            parse_message(r#"{"type":"teleport"}"#),
            Ok(ClientMessage::Unknown)
        ));
    }
}
