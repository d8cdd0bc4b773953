use couch_core::{ConnectionId, InboundMessage, RoomId, RoomState, RosterView, Timestamp};
use serde::Serialize;
use serde_json::Value;

/// A message pushed to a connection
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "info", rename_all = "snake_case")]
pub enum Outbound {
    /// The room doesn't exist (anymore)
    RoomInvalid { room_id: RoomId },
    /// The secret given was wrong, but the client joined as a guest anyway
    SecretInvalid { room_id: RoomId },
    RoomJoined {
        room: RoomState,
        clients: RosterView,
        admin: bool,
        you: ConnectionId,
    },
    RoomCreated {
        room: RoomState,
        secret: String,
        clients: RosterView,
        you: ConnectionId,
    },
    RoomState(RoomState),
    RoomClients {
        room_id: RoomId,
        clients: RosterView,
    },
    RoomMessage(ChatMessage),
    ClientError(ErrorReport),
    ClientConfused(ErrorReport),
    /// The id of a new checkout session
    PaymentSession(String),
    PaymentPaid(bool),
}

impl Outbound {
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A chat message as delivered to a room
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub room_id: RoomId,
    pub sender: ConnectionId,
    /// The sender's name at the time of sending
    pub name: Option<String>,
    /// Escaped text with line breaks and links as markup
    pub html: String,
    pub timestamp: Timestamp,
}

/// Tells a client what went wrong with a message it sent
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub message: String,
    pub received: Received,
}

/// As much of the offending message as could be parsed
#[derive(Debug, Clone, Default, Serialize)]
pub struct Received {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub info: Option<Value>,
}

impl From<&InboundMessage> for Received {
    fn from(message: &InboundMessage) -> Self {
        Self {
            kind: Some(message.kind.clone()),
            info: Some(Value::Object(message.info.clone())),
        }
    }
}
