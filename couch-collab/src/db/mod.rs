use async_trait::async_trait;
use couch_core::{
    AdminsOnly, ClientData, ConnectionId, Membership, Playlist, RoomData, RoomId, Timestamp,
};
use thiserror::Error;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A conditional update found no record to update
    #[error("{resource}:{identifier} failed the update condition")]
    ConditionFailed {
        resource: &'static str,
        identifier: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: String,
    },
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult<T> {
    /// Turns a not found error into `None`
    fn optional(self) -> Result<Option<T>>;
}

impl<T> DatabaseResult<T> for Result<T> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// How fresh a read has to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consistency {
    /// May miss writes that happened very recently
    Eventual,
    /// Sees every write that completed before the read
    Strong,
}

/// A single field of a client record to set
#[derive(Debug, Clone, PartialEq)]
pub enum ClientField {
    Name(Option<String>),
    Membership(Membership),
    /// Ignored if the client is not in a room
    Synced(Option<f64>),
}

impl ClientField {
    pub fn apply(&self, client: &mut ClientData) {
        match self {
            Self::Name(name) => client.name = name.clone(),
            Self::Membership(membership) => client.membership = membership.clone(),
            Self::Synced(value) => {
                if let Membership::InRoom { synced, .. } = &mut client.membership {
                    *synced = *value
                }
            }
        }
    }
}

/// A single field of a room record to set
#[derive(Debug, Clone, PartialEq)]
pub enum RoomField {
    Name(String),
    /// Media and playback are always written together so `loaded` never points at the wrong item
    Playlist(Playlist),
    AdminsOnly(AdminsOnly, bool),
}

impl RoomField {
    pub fn apply(&self, room: &mut RoomData) {
        match self {
            Self::Name(name) => room.name = name.clone(),
            Self::Playlist(playlist) => {
                room.media = playlist.media.clone();
                room.playback = playlist.playback;
            }
            Self::AdminsOnly(action, admins_only) => room.admins_only.set(*action, *admins_only),
        }
    }
}

/// Represents a store that keeps couch's client and room records.
///
/// Records are atomic on their own, but nothing is atomic across records.
/// Records past their expiry are never returned.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn client(&self, socket: &str) -> Result<ClientData>;
    /// Creates or replaces a client record
    async fn put_client(&self, client: ClientData) -> Result<()>;
    /// Sets fields of a client record, failing if the record doesn't exist.
    /// Returns the record as it is after the update.
    async fn update_client(&self, socket: &str, fields: &[ClientField]) -> Result<ClientData>;
    async fn delete_client(&self, socket: &str) -> Result<()>;
    /// Returns the clients in a room, in the order they joined
    async fn clients_in_room(&self, room_id: &str) -> Result<Vec<ClientData>>;

    async fn room(&self, room_id: &str, consistency: Consistency) -> Result<RoomData>;
    /// Creates or replaces a room record
    async fn put_room(&self, room: RoomData) -> Result<()>;
    /// Sets fields of a room record, failing if the record doesn't exist.
    /// Returns the record as it is after the update.
    async fn update_room(&self, room_id: &str, fields: &[RoomField]) -> Result<RoomData>;
    async fn delete_room(&self, room_id: &str) -> Result<()>;

    /// Removes every record that expired before `now`, returning how many were removed
    async fn clear_expired(&self, now: Timestamp) -> Result<u64>;
}

pub(crate) fn client_not_found(socket: &str) -> DatabaseError {
    DatabaseError::NotFound {
        resource: "client",
        identifier: ConnectionId::from(socket),
    }
}

pub(crate) fn room_not_found(room_id: &str) -> DatabaseError {
    DatabaseError::NotFound {
        resource: "room",
        identifier: RoomId::from(room_id),
    }
}

pub(crate) fn client_condition_failed(socket: &str) -> DatabaseError {
    DatabaseError::ConditionFailed {
        resource: "client",
        identifier: socket.to_string(),
    }
}

pub(crate) fn room_condition_failed(room_id: &str) -> DatabaseError {
    DatabaseError::ConditionFailed {
        resource: "room",
        identifier: room_id.to_string(),
    }
}
