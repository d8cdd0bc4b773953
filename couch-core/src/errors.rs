use thiserror::Error;

/// An error caused by the request itself rather than by the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The request was malformed or broke a hard rule. Should not normally happen.
    #[error("{0}")]
    ClientError(String),
    /// The request disagrees with the current state, most likely because of lag
    /// or messages arriving out of order.
    #[error("{0}")]
    ClientConfused(String),
}

impl RequestError {
    pub fn client_error(message: impl Into<String>) -> Self {
        Self::ClientError(message.into())
    }

    pub fn client_confused(message: impl Into<String>) -> Self {
        Self::ClientConfused(message.into())
    }

    /// Returns the message that is sent back to the client
    pub fn message(&self) -> &str {
        match self {
            Self::ClientError(message) | Self::ClientConfused(message) => message,
        }
    }
}
