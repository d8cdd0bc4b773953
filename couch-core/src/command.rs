use serde_json::{Map, Value};

use crate::{AdminsOnly, ConnectionId, Fields, RequestError};

const CONNECT: &str = "aws_connect";
const DISCONNECT: &str = "aws_disconnect";

/// A message as it arrived, before its fields are validated
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub kind: String,
    pub info: Map<String, Value>,
    /// Only set for the synthetic open and close messages
    lifecycle: bool,
}

impl InboundMessage {
    /// Parses the body of a message sent by a client
    pub fn parse(body: &str) -> Result<Self, RequestError> {
        let message: Value = serde_json::from_str(body)
            .map_err(|_| RequestError::client_error("Message body is not valid JSON"))?;

        let Value::Object(mut message) = message else {
            return Err(RequestError::client_error(
                "Message body is not a JSON object",
            ));
        };

        let kind = match message.remove("type") {
            Some(Value::String(kind)) if !kind.is_empty() => kind,
            _ => return Err(RequestError::client_error("Message type not provided")),
        };

        let info = match message.remove("info") {
            Some(Value::Object(info)) => info,
            _ => return Err(RequestError::client_error("Message info not provided")),
        };

        Ok(Self {
            kind,
            info,
            lifecycle: false,
        })
    }

    /// The message injected when a connection opens
    pub fn connect(socket: &str) -> Self {
        Self::lifecycle(CONNECT, socket)
    }

    /// The message injected when a connection closes
    pub fn disconnect(socket: &str) -> Self {
        Self::lifecycle(DISCONNECT, socket)
    }

    fn lifecycle(kind: &str, socket: &str) -> Self {
        let mut info = Map::new();
        info.insert("socket".to_string(), Value::String(socket.to_string()));

        Self {
            kind: kind.to_string(),
            info,
            lifecycle: true,
        }
    }
}

/// Everything a connection can ask of the server
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A connection opened
    Connect { socket: ConnectionId },
    /// A connection closed
    Disconnect { socket: ConnectionId },

    ClientJoin {
        room_id: String,
        room_secret: Option<String>,
        client_name: Option<String>,
    },
    ClientLeave {
        room_id: String,
    },
    ClientName {
        client_name: Option<String>,
    },
    ClientSynced {
        /// How far off the client is in ms, or `None` if it lost sync
        client_synced: Option<f64>,
    },
    ClientFeedback {
        feedback: String,
        user_agent: String,
        email: Option<String>,
    },

    RoomCreate {
        client_name: Option<String>,
        /// The room to copy the name and playlist of
        room_id_copy: Option<String>,
        room_name: Option<String>,
    },
    RoomDelete {
        room_id: String,
        room_secret: String,
    },
    RoomName {
        room_id: String,
        room_name: String,
    },
    RoomMessage {
        room_id: String,
        message: String,
    },
    RoomAdminsOnly {
        room_id: String,
        action: AdminsOnly,
        admins_only: bool,
    },

    RoomMediaAdd {
        room_id: String,
        name: String,
        kind: String,
        content: Map<String, Value>,
    },
    RoomMediaRearrange {
        room_id: String,
        media_id: String,
        media_id_after: String,
    },
    RoomMediaPlay {
        room_id: String,
        start: f64,
    },
    RoomMediaPause {
        room_id: String,
        paused: f64,
    },
    RoomMediaLoad {
        room_id: String,
        media_id: String,
    },
    RoomMediaRemove {
        room_id: String,
        media_id: String,
    },

    PaymentSession {
        /// In cents
        amount: i64,
        return_url: String,
    },
    PaymentPaid {
        email: String,
    },
}

impl Command {
    /// Validates a message into a command
    pub fn parse(message: &InboundMessage) -> Result<Self, RequestError> {
        let info = &message.info;

        let command = match message.kind.as_str() {
            CONNECT | DISCONNECT if message.lifecycle => {
                let socket = info
                    .get("socket")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();

                if message.kind == CONNECT {
                    Self::Connect { socket }
                } else {
                    Self::Disconnect { socket }
                }
            }

            "client_join" => {
                let mut f = Fields::expect(info, &["room_id"], &["room_secret", "client_name"])?;

                Self::ClientJoin {
                    room_id: f.string("room_id")?,
                    room_secret: f.optional_string("room_secret"),
                    client_name: f.optional_string("client_name"),
                }
            }
            "client_leave" => {
                let mut f = Fields::expect(info, &["room_id"], &[])?;

                Self::ClientLeave {
                    room_id: f.string("room_id")?,
                }
            }
            "client_name" => {
                let mut f = Fields::expect(info, &[], &["client_name"])?;

                Self::ClientName {
                    client_name: f.optional_string("client_name"),
                }
            }
            "client_synced" => {
                let mut f = Fields::expect(info, &[], &["client_synced"])?;

                Self::ClientSynced {
                    client_synced: f.optional_number("client_synced"),
                }
            }
            "client_feedback" => {
                let mut f = Fields::expect(
                    info,
                    &["client_feedback", "client_user_agent"],
                    &["client_email"],
                )?;

                Self::ClientFeedback {
                    feedback: f.string("client_feedback")?,
                    user_agent: f.string("client_user_agent")?,
                    email: f.optional_string("client_email"),
                }
            }

            "room_create" => {
                let mut f =
                    Fields::expect(info, &[], &["client_name", "room_id_copy", "room_name"])?;

                Self::RoomCreate {
                    client_name: f.optional_string("client_name"),
                    room_id_copy: f.optional_string("room_id_copy"),
                    room_name: f.optional_string("room_name"),
                }
            }
            "room_delete" => {
                let mut f = Fields::expect(info, &["room_id", "room_secret"], &[])?;

                Self::RoomDelete {
                    room_id: f.string("room_id")?,
                    room_secret: f.string("room_secret")?,
                }
            }
            "room_name" => {
                let mut f = Fields::expect(info, &["room_id", "room_name"], &[])?;

                Self::RoomName {
                    room_id: f.string("room_id")?,
                    room_name: f.string("room_name")?,
                }
            }
            "room_message" => {
                let mut f = Fields::expect(info, &["room_id", "room_message"], &[])?;

                Self::RoomMessage {
                    room_id: f.string("room_id")?,
                    message: f.string("room_message")?,
                }
            }
            "room_admins_only_dj" => Self::admins_only(info, AdminsOnly::Dj)?,
            "room_admins_only_see_clients" => Self::admins_only(info, AdminsOnly::SeeClients)?,
            "room_admins_only_chat" => Self::admins_only(info, AdminsOnly::Chat)?,

            "room_media_add" => {
                let mut f = Fields::expect(
                    info,
                    &["room_id", "media_name", "media_type", "media_content"],
                    &[],
                )?;

                Self::RoomMediaAdd {
                    room_id: f.string("room_id")?,
                    name: f.string("media_name")?,
                    kind: f.string("media_type")?,
                    content: f.object("media_content")?,
                }
            }
            "room_media_rearrange" => {
                let mut f = Fields::expect(info, &["room_id", "media_id", "media_id_after"], &[])?;

                Self::RoomMediaRearrange {
                    room_id: f.string("room_id")?,
                    media_id: f.string("media_id")?,
                    media_id_after: f.string("media_id_after")?,
                }
            }
            "room_media_play" => {
                let mut f = Fields::expect(info, &["room_id", "room_start"], &[])?;

                Self::RoomMediaPlay {
                    room_id: f.string("room_id")?,
                    start: f.number("room_start")?,
                }
            }
            "room_media_pause" => {
                let mut f = Fields::expect(info, &["room_id", "room_paused"], &[])?;

                Self::RoomMediaPause {
                    room_id: f.string("room_id")?,
                    paused: f.number("room_paused")?,
                }
            }
            "room_media_load" => {
                let mut f = Fields::expect(info, &["room_id", "media_id"], &[])?;

                Self::RoomMediaLoad {
                    room_id: f.string("room_id")?,
                    media_id: f.string("media_id")?,
                }
            }
            "room_media_remove" => {
                let mut f = Fields::expect(info, &["room_id", "media_id"], &[])?;

                Self::RoomMediaRemove {
                    room_id: f.string("room_id")?,
                    media_id: f.string("media_id")?,
                }
            }

            "payment_session" => {
                let mut f = Fields::expect(info, &["payment_amount", "payment_return_url"], &[])?;

                Self::PaymentSession {
                    amount: f.integer("payment_amount")?,
                    return_url: f.string("payment_return_url")?,
                }
            }
            "payment_paid" => {
                let mut f = Fields::expect(info, &["client_email"], &[])?;

                Self::PaymentPaid {
                    email: f.string("client_email")?,
                }
            }

            other => {
                return Err(RequestError::client_error(format!(
                    "Message type '{other}' not valid"
                )))
            }
        };

        Ok(command)
    }

    fn admins_only(info: &Map<String, Value>, action: AdminsOnly) -> Result<Self, RequestError> {
        let mut f = Fields::expect(info, &["room_id", "room_admins_only"], &[])?;

        Ok(Self::RoomAdminsOnly {
            room_id: f.string("room_id")?,
            action,
            admins_only: f.bool("room_admins_only")?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_body() {
        let message = InboundMessage::parse(
            r#"{"type": "client_join", "info": {"room_id": "abcd1234", "room_secret": "", "client_name": " Ana "}}"#,
        )
        .unwrap();

        assert_eq!(
            Command::parse(&message).unwrap(),
            Command::ClientJoin {
                room_id: "abcd1234".to_string(),
                room_secret: None,
                client_name: Some("Ana".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_body_errors() {
        let cases = [
            ("not json", "Message body is not valid JSON"),
            ("[1, 2]", "Message body is not a JSON object"),
            (r#"{"info": {}}"#, "Message type not provided"),
            (r#"{"type": "", "info": {}}"#, "Message type not provided"),
            (r#"{"type": "client_name"}"#, "Message info not provided"),
            (
                r#"{"type": "client_name", "info": []}"#,
                "Message info not provided",
            ),
        ];

        for (body, expected) in cases {
            assert_eq!(
                InboundMessage::parse(body),
                Err(RequestError::client_error(expected)),
                "body {body} should be rejected"
            );
        }
    }

    #[test]
    fn test_unknown_type() {
        let message = InboundMessage::parse(r#"{"type": "room_explode", "info": {}}"#).unwrap();

        assert_eq!(
            Command::parse(&message),
            Err(RequestError::client_error(
                "Message type 'room_explode' not valid"
            ))
        );
    }

    #[test]
    fn test_lifecycle_messages_are_not_accepted_from_clients() {
        let forged =
            InboundMessage::parse(r#"{"type": "aws_disconnect", "info": {"socket": "other"}}"#)
                .unwrap();

        assert!(Command::parse(&forged).is_err());
        assert_eq!(
            Command::parse(&InboundMessage::disconnect("abc")),
            Ok(Command::Disconnect {
                socket: "abc".to_string()
            })
        );
    }

    #[test]
    fn test_admins_only_commands() {
        let message = InboundMessage::parse(
            r#"{"type": "room_admins_only_see_clients", "info": {"room_id": "r", "room_admins_only": true}}"#,
        )
        .unwrap();

        assert_eq!(
            Command::parse(&message),
            Ok(Command::RoomAdminsOnly {
                room_id: "r".to_string(),
                action: AdminsOnly::SeeClients,
                admins_only: true,
            })
        );
    }
}
