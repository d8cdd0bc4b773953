use couch_core::{ClientData, ConnectionId, RequestError, RoomData, RoomId};

use crate::{
    ClientField, CollabContext, CollabError, CollabResult, Consistency, Database,
    DatabaseResult, RoomField,
};

/// The state of a single message being handled.
///
/// Records are read through and written through a cache that only lives as long
/// as the request, so reads within one request always see its own writes.
pub struct Request<'a, Db> {
    context: &'a CollabContext<Db>,
    /// The connection that sent the message
    sender: ConnectionId,
    client: Option<ClientData>,
    /// The cached room, along with the id it was fetched for
    room: Option<(RoomId, Option<RoomData>)>,
}

impl<'a, Db> Request<'a, Db>
where
    Db: Database,
{
    pub fn new(context: &'a CollabContext<Db>, sender: &str) -> Self {
        Self {
            context,
            sender: sender.to_string(),
            client: None,
            room: None,
        }
    }

    pub fn context(&self) -> &'a CollabContext<Db> {
        self.context
    }

    pub fn database(&self) -> &'a Db {
        &self.context.database
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Returns the sender's record, which is expected to exist as it is created on connect
    pub async fn client(&mut self) -> CollabResult<ClientData> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }

        let client = self.database().client(&self.sender).await?;
        self.client = Some(client.clone());

        Ok(client)
    }

    /// Returns the sender's record, or `None` if it expired or was never created
    pub async fn try_client(&mut self) -> CollabResult<Option<ClientData>> {
        if self.client.is_some() {
            return self.client().await.map(Some);
        }

        let client = self.database().client(&self.sender).await.optional()?;
        self.client = client.clone();

        Ok(client)
    }

    /// Sets fields of the sender's record, as long as it still exists
    pub async fn update_client(&mut self, fields: &[ClientField]) -> CollabResult<ClientData> {
        let client = self.database().update_client(&self.sender, fields).await?;
        self.client = Some(client.clone());

        Ok(client)
    }

    /// Returns the room the sender is in, if any
    pub async fn room(&mut self) -> CollabResult<Option<RoomData>> {
        let client = self.client().await?;

        let Some(room_id) = client.membership.room_id() else {
            return Ok(None);
        };

        if let Some((cached_id, room)) = &self.room {
            if cached_id == room_id {
                return Ok(room.clone());
            }
        }

        // Room state matters too much to risk a stale read
        let room = self
            .database()
            .room(room_id, Consistency::Strong)
            .await
            .optional()?;

        self.room = Some((room_id.to_string(), room.clone()));
        Ok(room)
    }

    /// Returns the room the sender is in, which is expected to exist
    pub async fn require_room(&mut self) -> CollabResult<RoomData> {
        self.room()
            .await?
            .ok_or_else(|| RequestError::client_confused("Room no longer exists").into())
    }

    /// Sets fields of the sender's room, as long as it still exists
    pub async fn update_room(&mut self, fields: &[RoomField]) -> CollabResult<RoomData> {
        let client = self.client().await?;

        let Some(room_id) = client.membership.room_id() else {
            return Err(CollabError::Request(RequestError::client_error(
                "Database condition failed (notify support)",
            )));
        };

        let room = self.database().update_room(room_id, fields).await?;
        self.room = Some((room_id.to_string(), Some(room.clone())));

        Ok(room)
    }

    /// Caches a room that was just read or written by a handler
    pub fn seed_room(&mut self, room: RoomData) {
        self.room = Some((room.id.clone(), Some(room)));
    }
}

#[cfg(test)]
mod test {
    use couch_core::{Membership, Permissions, Playback};

    use crate::{testing::TestCollab, util::now};

    use super::*;

    fn room(id: &str, name: &str) -> RoomData {
        RoomData {
            id: id.to_string(),
            secret: "secret".to_string(),
            name: name.to_string(),
            media: vec![],
            playback: Playback::Unloaded,
            admins_only: Permissions::default(),
            created: now(),
            expire: now() + 60.,
        }
    }

    #[tokio::test]
    async fn test_missing_client_is_a_fault() {
        let test = TestCollab::new();
        let mut request = Request::new(test.context(), "nobody");

        assert!(
            matches!(request.client().await, Err(CollabError::Database(_))),
            "a missing client record should be a server fault"
        );
        assert!(request.try_client().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_cache() {
        let test = TestCollab::new();
        test.connect("abc").await;

        let mut request = Request::new(test.context(), "abc");
        assert_eq!(request.client().await.unwrap().name, None);

        request
            .update_client(&[ClientField::Name(Some("Ana".to_string()))])
            .await
            .unwrap();

        assert_eq!(
            request.client().await.unwrap().name.as_deref(),
            Some("Ana"),
            "the cache should hold what the update returned"
        );
        assert!(
            request.room().await.unwrap().is_none(),
            "a client outside a room has no room"
        );
    }

    #[tokio::test]
    async fn test_room_cache_follows_membership() {
        let test = TestCollab::new();
        test.connect("abc").await;

        let database = test.collab.database();
        database.put_room(room("one", "First")).await.unwrap();
        database.put_room(room("two", "Second")).await.unwrap();

        let mut request = Request::new(test.context(), "abc");

        for (room_id, name) in [("one", "First"), ("two", "Second")] {
            request
                .update_client(&[ClientField::Membership(Membership::InRoom {
                    room_id: room_id.to_string(),
                    joined: now(),
                    admin: false,
                    synced: None,
                })])
                .await
                .unwrap();

            assert_eq!(
                request.require_room().await.unwrap().name,
                name,
                "the cached room should be refetched when the client moves"
            );
        }

        database.delete_room("two").await.unwrap();
        assert_eq!(
            request.require_room().await.unwrap().name,
            "Second",
            "a cached room should be reused within the request"
        );

        let mut fresh = Request::new(test.context(), "abc");
        assert!(matches!(
            fresh.require_room().await,
            Err(CollabError::Request(RequestError::ClientConfused(_)))
        ));
    }

    #[tokio::test]
    async fn test_update_room_fails_once_deleted() {
        let test = TestCollab::new();
        test.connect("abc").await;
        test.collab
            .database()
            .put_room(room("one", "First"))
            .await
            .unwrap();

        let mut request = Request::new(test.context(), "abc");
        request
            .update_client(&[ClientField::Membership(Membership::InRoom {
                room_id: "one".to_string(),
                joined: now(),
                admin: true,
                synced: None,
            })])
            .await
            .unwrap();

        test.collab.database().delete_room("one").await.unwrap();

        let result = request
            .update_room(&[RoomField::Name("Renamed".to_string())])
            .await;

        assert!(
            matches!(result, Err(CollabError::Request(RequestError::ClientError(ref m))) if m == "Database condition failed (notify support)"),
            "updating a deleted room should fail its condition"
        );
    }
}
