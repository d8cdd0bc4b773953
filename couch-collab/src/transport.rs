use async_trait::async_trait;
use couch_core::ConnectionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection closed before the message could be delivered.
    /// Expected now and then, as membership reads can be stale.
    #[error("Connection {0} is gone")]
    Gone(ConnectionId),
    #[error("Could not deliver message to {socket}: {reason}")]
    Other {
        socket: ConnectionId,
        reason: String,
    },
}

/// Pushes messages to open connections
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, socket: &str, text: String) -> Result<(), TransportError>;
}
