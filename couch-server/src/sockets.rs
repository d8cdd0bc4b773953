use async_trait::async_trait;
use axum::extract::ws::Message;
use couch_collab::{Transport, TransportError};
use couch_core::ConnectionId;
use dashmap::DashMap;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Keeps track of open websocket connections, and delivers messages to them
#[derive(Debug, Default)]
pub struct WebSocketManager {
    connections: DashMap<ConnectionId, UnboundedSender<Message>>,
}

impl WebSocketManager {
    /// Registers a connection, returning the messages that should be written to it
    pub fn register_connection(&self, id: &str) -> UnboundedReceiver<Message> {
        let (sender, receiver) = unbounded_channel();
        self.connections.insert(id.to_string(), sender);

        receiver
    }

    /// Forgets a connection. Its writer stops once everything queued is written.
    pub fn unregister_connection(&self, id: &str) {
        self.connections.remove(id);
    }

    /// Queues a message for a connection, returning false if it is gone
    pub fn push(&self, id: &str, message: Message) -> bool {
        self.connections
            .get(id)
            .map(|sender| sender.send(message).is_ok())
            .unwrap_or(false)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[async_trait]
impl Transport for WebSocketManager {
    async fn send(&self, socket: &str, text: String) -> Result<(), TransportError> {
        if self.push(socket, Message::Text(text)) {
            Ok(())
        } else {
            Err(TransportError::Gone(socket.to_string()))
        }
    }
}
