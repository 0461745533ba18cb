use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    state::{SessionCommand, SharedState, game::ConnectionId},
};

const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle the full lifecycle for an individual player WebSocket connection.
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

    let initial_message = match tokio::time::timeout(JOIN_TIMEOUT, receiver.next()).await {
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
            warn!("websocket join timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let inbound = match ClientMessage::from_json_str(&initial_message) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "failed to parse or validate join message");
            reject(&outbound_tx, err.to_string());
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let ClientMessage::Join {
        display_name,
        room,
        mode,
    } = inbound
    else {
        warn!("first message was not join");
        reject(&outbound_tx, "first message must be a join".into());
        finalize(writer_task, outbound_tx).await;
        return;
    };

    let connection_id = Uuid::new_v4();
    let display_name = display_name.trim().to_string();
    let handle = match state.join_session(
        &room,
        mode.as_deref(),
        connection_id,
        &display_name,
        outbound_tx.clone(),
    ) {
        Ok(handle) => handle,
        Err(err) => {
            warn!(session = %room, error = %err, "cannot join session");
            reject(&outbound_tx, err.to_string());
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    info!(session = %room, connection = %connection_id, player = %display_name, "player connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(connection = %connection_id, payload = %text, "received player message");

                let command = match ClientMessage::from_json_str(&text) {
                    Ok(message) => command_for(connection_id, message),
                    Err(err) => {
                        warn!(connection = %connection_id, error = %err, "failed to parse or validate player message");
                        None
                    }
                };
                let Some(command) = command else {
                    continue;
                };
                if handle.send(command).is_err() {
                    info!(connection = %connection_id, "session closed, terminating");
                    break;
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(connection = %connection_id, "player closed");
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

    // Lost connections are handled as an explicit leave.
    let _ = handle.send(SessionCommand::Leave { connection_id });
    info!(session = %room, connection = %connection_id, "player disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Map a validated client message to the session command it triggers.
fn command_for(connection_id: ConnectionId, message: ClientMessage) -> Option<SessionCommand> {
    match message {
        ClientMessage::Ready => Some(SessionCommand::Ready { connection_id }),
        ClientMessage::Guess { text } => Some(SessionCommand::Guess {
            connection_id,
            text,
        }),
        ClientMessage::Skip => Some(SessionCommand::Skip { connection_id }),
        ClientMessage::Restart => Some(SessionCommand::Restart { connection_id }),
        ClientMessage::Chat { text } => Some(SessionCommand::Chat {
            connection_id,
            text,
        }),
        ClientMessage::Join { .. } => {
            warn!(connection = %connection_id, "ignoring duplicate join message");
            None
        }
        ClientMessage::Unknown => {
            warn!(connection = %connection_id, "ignoring unknown message type");
            None
        }
    }
}

/// Report a refused join to the client and close the socket.
fn reject(tx: &mpsc::UnboundedSender<Message>, message: String) {
    send_message_to_websocket(tx, &ServerMessage::Error { message });
    let _ = tx.send(Message::Close(None));
}

/// Serialize a payload and push it onto the provided WebSocket sender.
fn send_message_to_websocket<T>(tx: &mpsc::UnboundedSender<Message>, value: &T)
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    match serde_json::to_string(value) {
        Ok(payload) => {
            let _ = tx.send(Message::Text(payload.into()));
        }
        Err(err) => warn!(error = %err, "failed to serialize message `{value:?}`"),
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

    #[test]
    fn gameplay_messages_map_to_commands() {
        let id = Uuid::new_v4();
        assert!(matches!(
            command_for(id, ClientMessage::Guess { text: "Peru".into() }),
            Some(SessionCommand::Guess { connection_id, text }) if connection_id == id && text == "Peru"
        ));
        assert!(matches!(
            command_for(id, ClientMessage::Ready),
            Some(SessionCommand::Ready { .. })
        ));
        assert!(matches!(
            command_for(id, ClientMessage::Skip),
            Some(SessionCommand::Skip { .. })
        ));
        assert!(matches!(
            command_for(id, ClientMessage::Restart),
            Some(SessionCommand::Restart { .. })
        ));
    }

    #[test]
    fn repeated_join_and_unknown_messages_are_dropped() {
        let id = Uuid::new_v4();
        let join = ClientMessage::Join {
            display_name: "x".into(),
            room: "r".into(),
            mode: None,
        };
        assert!(command_for(id, join).is_none());
        assert!(command_for(id, ClientMessage::Unknown).is_none());
    }

    #[test]
    fn reject_sends_error_then_close() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        reject(&tx, "unknown mode `moons`".into());

        match rx.try_recv().unwrap() {
            Message::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                assert_eq!(value["type"], "error");
                assert_eq!(value["message"], "unknown mode `moons`");
            }
            other => panic!("expected text frame, got {other:?}"),
        }
        assert!(matches!(rx.try_recv().unwrap(), Message::Close(None)));
    }
}
