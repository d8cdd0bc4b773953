use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Fields, FieldKind, Playlist, RequestError};

/// The id of a transport connection, also the primary key of a client record
pub type ConnectionId = String;
pub type RoomId = String;
pub type MediaId = String;
/// Seconds since the unix epoch
pub type Timestamp = f64;

/// The record kept for every open connection
#[derive(Debug, Clone, PartialEq)]
pub struct ClientData {
    pub socket: ConnectionId,
    pub name: Option<String>,
    pub membership: Membership,
    pub expire: Timestamp,
}

/// Whether a client is in a room, and what it knows about that room
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Membership {
    #[default]
    None,
    InRoom {
        room_id: RoomId,
        /// When the client joined, used to order rosters
        joined: Timestamp,
        /// If this is true, the client presented the room's secret
        admin: bool,
        /// How far off the client's playback is in ms, or `None` if not synced yet
        synced: Option<f64>,
    },
}

impl Membership {
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::InRoom { room_id, .. } => Some(room_id),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::InRoom { admin: true, .. })
    }

    pub fn synced(&self) -> Option<f64> {
        match self {
            Self::None => None,
            Self::InRoom { synced, .. } => *synced,
        }
    }
}

/// A watch party
#[derive(Debug, Clone, PartialEq)]
pub struct RoomData {
    pub id: RoomId,
    /// Whoever knows this is an admin. Must never be sent to guests.
    pub secret: String,
    pub name: String,
    pub media: Vec<MediaItem>,
    pub playback: Playback,
    pub admins_only: Permissions,
    pub created: Timestamp,
    pub expire: Timestamp,
}

impl RoomData {
    /// Returns the state that is safe to share with everyone in the room
    pub fn state(&self) -> RoomState {
        RoomState {
            id: self.id.clone(),
            name: self.name.clone(),
            media: self.media.clone(),
            playback: self.playback,
            admins_only: self.admins_only,
        }
    }

    pub fn playlist(&self) -> Playlist {
        Playlist {
            media: self.media.clone(),
            playback: self.playback,
        }
    }
}

/// The public snapshot of a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomState {
    pub id: RoomId,
    pub name: String,
    pub media: Vec<MediaItem>,
    #[serde(flatten)]
    pub playback: Playback,
    #[serde(flatten)]
    pub admins_only: Permissions,
}

/// An item in a room's playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Only unique within its room
    pub id: MediaId,
    pub name: String,
    #[serde(flatten)]
    pub source: MediaSource,
}

/// Where a media item is played from, serialized as `type` and `content`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum MediaSource {
    Youtube { id: String },
}

impl MediaSource {
    /// Validates and sanitizes client supplied content for the given media type
    pub fn from_content(kind: &str, content: &Map<String, Value>) -> Result<Self, RequestError> {
        match kind {
            "youtube" => {
                let mut fields = Fields::expect_with(content, youtube_field_kind, &["id"], &[])?;
                let id = fields.string("id")?;

                // The id ends up in embed urls
                let id = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();

                Ok(Self::Youtube { id })
            }
            other => Err(RequestError::client_error(format!(
                "Invalid media type: {other}"
            ))),
        }
    }
}

fn youtube_field_kind(name: &str) -> Option<FieldKind> {
    match name {
        "id" => Some(FieldKind::String),
        _ => None,
    }
}

/// Where a room's loaded item is at.
/// Serialized as the nullable `loaded`, `start` and `paused` fields.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "PlaybackFields", into = "PlaybackFields")]
pub enum Playback {
    /// Nothing is loaded
    #[default]
    Unloaded,
    /// Paused `offset` ms into the loaded item
    Paused { loaded: usize, offset: f64 },
    /// Playing since `start`, which may be in the future
    Playing { loaded: usize, start: Timestamp },
}

impl Playback {
    /// Loads an item, always paused at its beginning
    pub fn load(index: usize) -> Self {
        Self::Paused {
            loaded: index,
            offset: 0.,
        }
    }

    pub fn loaded(&self) -> Option<usize> {
        match self {
            Self::Unloaded => None,
            Self::Paused { loaded, .. } | Self::Playing { loaded, .. } => Some(*loaded),
        }
    }

    pub fn start(&self) -> Option<Timestamp> {
        match self {
            Self::Playing { start, .. } => Some(*start),
            _ => None,
        }
    }

    pub fn paused(&self) -> Option<f64> {
        match self {
            Self::Paused { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Points the playback at another index without touching its position
    pub fn with_loaded(self, index: usize) -> Self {
        match self {
            Self::Unloaded => Self::Unloaded,
            Self::Paused { offset, .. } => Self::Paused {
                loaded: index,
                offset,
            },
            Self::Playing { start, .. } => Self::Playing {
                loaded: index,
                start,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct PlaybackFields {
    loaded: Option<usize>,
    start: Option<Timestamp>,
    paused: Option<f64>,
}

impl From<PlaybackFields> for Playback {
    fn from(fields: PlaybackFields) -> Self {
        match (fields.loaded, fields.start) {
            (None, _) => Self::Unloaded,
            (Some(loaded), Some(start)) => Self::Playing { loaded, start },
            (Some(loaded), None) => Self::Paused {
                loaded,
                offset: fields.paused.unwrap_or_default(),
            },
        }
    }
}

impl From<Playback> for PlaybackFields {
    fn from(playback: Playback) -> Self {
        Self {
            loaded: playback.loaded(),
            start: playback.start(),
            paused: playback.paused(),
        }
    }
}

/// A room action that can be restricted to admins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminsOnly {
    /// Changing the playlist and playback
    Dj,
    /// Seeing who else is in the room
    SeeClients,
    Chat,
}

/// Which actions of a room are restricted to admins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(rename = "admins_only_dj")]
    pub dj: bool,
    #[serde(rename = "admins_only_see_clients")]
    pub see_clients: bool,
    #[serde(rename = "admins_only_chat")]
    pub chat: bool,
}

impl Permissions {
    pub fn get(&self, action: AdminsOnly) -> bool {
        match action {
            AdminsOnly::Dj => self.dj,
            AdminsOnly::SeeClients => self.see_clients,
            AdminsOnly::Chat => self.chat,
        }
    }

    pub fn set(&mut self, action: AdminsOnly, admins_only: bool) {
        match action {
            AdminsOnly::Dj => self.dj = admins_only,
            AdminsOnly::SeeClients => self.see_clients = admins_only,
            AdminsOnly::Chat => self.chat = admins_only,
        }
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            dj: true,
            see_clients: false,
            chat: false,
        }
    }
}
