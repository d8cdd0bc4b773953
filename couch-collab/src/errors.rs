use couch_core::RequestError;
use thiserror::Error;

use crate::{DatabaseError, NotifyError, PaymentError, TransportError};

pub type CollabResult<T> = Result<T, CollabError>;

/// Anything that can go wrong while handling a message
#[derive(Debug, Error)]
pub enum CollabError {
    /// Caused by the client, and reported back to it
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("Database error")]
    Database(#[source] DatabaseError),
    #[error("Transport error")]
    Transport(#[from] TransportError),
    #[error("Payment error")]
    Payment(#[from] PaymentError),
    #[error("Notify error")]
    Notify(#[from] NotifyError),
    #[error("Could not serialize message")]
    Serialize(#[from] serde_json::Error),
}

impl From<DatabaseError> for CollabError {
    fn from(value: DatabaseError) -> Self {
        match value {
            // Most likely the client disconnected or the room expired mid request
            DatabaseError::ConditionFailed { .. } => Self::Request(RequestError::client_error(
                "Database condition failed (notify support)",
            )),
            e => Self::Database(e),
        }
    }
}

impl CollabError {
    /// Returns the error and everything that caused it, one per line
    pub fn chain(&self) -> String {
        let mut lines = vec![self.to_string()];
        let mut source = std::error::Error::source(self);

        while let Some(error) = source {
            lines.push(format!("caused by: {error}"));
            source = error.source();
        }

        lines.join("\n")
    }
}
