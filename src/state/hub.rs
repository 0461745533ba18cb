use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::warn;

use crate::{dto::ws::ServerMessage, state::game::ConnectionId};

/// Fan-out of session messages to connected clients.
pub trait Outbox: Send + Sync {
    /// Deliver `message` to every connection of the session.
    fn broadcast(&self, message: &ServerMessage);
    /// Deliver `message` to a single connection.
    fn send_to(&self, connection_id: ConnectionId, message: &ServerMessage);
}

/// Writer channels of the sockets attached to one session.
#[derive(Default)]
pub struct ConnectionHub {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
}

impl ConnectionHub {
    /// Hub without any connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the writer channel of a socket.
    pub fn register(&self, connection_id: ConnectionId, tx: mpsc::UnboundedSender<Message>) {
        self.connections.insert(connection_id, tx);
    }

    /// Detach a socket; later messages are no longer delivered to it.
    pub fn unregister(&self, connection_id: &ConnectionId) {
        self.connections.remove(connection_id);
    }

    /// Number of attached sockets.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no socket is attached.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Outbox for ConnectionHub {
    fn broadcast(&self, message: &ServerMessage) {
        let Some(payload) = serialize(message) else {
            return;
        };
        // Writers that went away are cleaned up by the leave that follows.
        for entry in self.connections.iter() {
            let _ = entry.value().send(Message::Text(payload.clone().into()));
        }
    }

    fn send_to(&self, connection_id: ConnectionId, message: &ServerMessage) {
        let Some(payload) = serialize(message) else {
            return;
        };
        let Some(tx) = self.connections.get(&connection_id).map(|entry| entry.clone()) else {
            warn!(connection = %connection_id, "cannot send message: connection not attached");
            return;
        };
        let _ = tx.send(Message::Text(payload.into()));
    }
}

fn serialize(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{message:?}`");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn text(message: Message) -> serde_json::Value {
        match message {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[test]
    fn broadcast_reaches_every_connection() {
        let hub = ConnectionHub::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        hub.register(Uuid::new_v4(), tx_a);
        hub.register(Uuid::new_v4(), tx_b);

        hub.broadcast(&ServerMessage::Tick { turn_time_left: 4 });

        assert_eq!(text(rx_a.try_recv().unwrap())["turn_time_left"], 4);
        assert_eq!(text(rx_b.try_recv().unwrap())["type"], "tick");
    }

    #[test]
    fn send_to_targets_one_connection() {
        let hub = ConnectionHub::new();
        let (id_a, id_b) = (Uuid::new_v4(), Uuid::new_v4());
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        hub.register(id_a, tx_a);
        hub.register(id_b, tx_b);

        hub.send_to(
            id_b,
            &ServerMessage::Error {
                message: "nope".into(),
            },
        );

        assert!(rx_a.try_recv().is_err());
        assert_eq!(text(rx_b.try_recv().unwrap())["message"], "nope");
    }

    #[test]
    fn unregistered_connections_stop_receiving() {
        let hub = ConnectionHub::new();
        let id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.register(id, tx);
        assert_eq!(hub.len(), 1);
        hub.unregister(&id);

        hub.broadcast(&ServerMessage::Tick { turn_time_left: 1 });
        assert!(rx.try_recv().is_err());
        assert!(hub.is_empty());
    }
}
