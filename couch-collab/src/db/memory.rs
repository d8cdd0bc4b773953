use async_trait::async_trait;
use couch_core::{ClientData, ConnectionId, Membership, RoomData, RoomId, Timestamp};
use crossbeam::atomic::AtomicCell;
use dashmap::DashMap;

use crate::{
    client_condition_failed, client_not_found, room_condition_failed, room_not_found,
    util::now, ClientField, Consistency, Database, Result, RoomField,
};

/// An in-process database, for running a single server without postgres.
/// Every read is strongly consistent.
#[derive(Default)]
pub struct MemoryDatabase {
    clients: DashMap<ConnectionId, StoredClient>,
    rooms: DashMap<RoomId, RoomData>,
    /// Breaks ties between clients that joined at the same time
    sequence: AtomicCell<u64>,
}

struct StoredClient {
    sequence: u64,
    data: ClientData,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_live(expire: Timestamp) -> bool {
    expire > now()
}

fn joined(membership: &Membership) -> Timestamp {
    match membership {
        Membership::InRoom { joined, .. } => *joined,
        Membership::None => 0.,
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn client(&self, socket: &str) -> Result<ClientData> {
        self.clients
            .get(socket)
            .filter(|c| is_live(c.data.expire))
            .map(|c| c.data.clone())
            .ok_or_else(|| client_not_found(socket))
    }

    async fn put_client(&self, client: ClientData) -> Result<()> {
        let stored = StoredClient {
            sequence: self.sequence.fetch_add(1),
            data: client,
        };

        self.clients.insert(stored.data.socket.clone(), stored);
        Ok(())
    }

    async fn update_client(&self, socket: &str, fields: &[ClientField]) -> Result<ClientData> {
        let mut stored = self
            .clients
            .get_mut(socket)
            .filter(|c| is_live(c.data.expire))
            .ok_or_else(|| client_condition_failed(socket))?;

        for field in fields {
            field.apply(&mut stored.data);
        }

        Ok(stored.data.clone())
    }

    async fn delete_client(&self, socket: &str) -> Result<()> {
        self.clients.remove(socket);
        Ok(())
    }

    async fn clients_in_room(&self, room_id: &str) -> Result<Vec<ClientData>> {
        let mut clients: Vec<_> = self
            .clients
            .iter()
            .filter(|c| is_live(c.data.expire) && c.data.membership.room_id() == Some(room_id))
            .map(|c| (joined(&c.data.membership), c.sequence, c.data.clone()))
            .collect();

        clients.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        Ok(clients.into_iter().map(|(_, _, client)| client).collect())
    }

    async fn room(&self, room_id: &str, _consistency: Consistency) -> Result<RoomData> {
        self.rooms
            .get(room_id)
            .filter(|r| is_live(r.expire))
            .map(|r| r.value().clone())
            .ok_or_else(|| room_not_found(room_id))
    }

    async fn put_room(&self, room: RoomData) -> Result<()> {
        self.rooms.insert(room.id.clone(), room);
        Ok(())
    }

    async fn update_room(&self, room_id: &str, fields: &[RoomField]) -> Result<RoomData> {
        let mut room = self
            .rooms
            .get_mut(room_id)
            .filter(|r| is_live(r.expire))
            .ok_or_else(|| room_condition_failed(room_id))?;

        for field in fields {
            field.apply(&mut room);
        }

        Ok(room.clone())
    }

    async fn delete_room(&self, room_id: &str) -> Result<()> {
        self.rooms.remove(room_id);
        Ok(())
    }

    async fn clear_expired(&self, now: Timestamp) -> Result<u64> {
        let mut removed = 0;

        self.clients.retain(|_, c| {
            let keep = c.data.expire > now;
            removed += u64::from(!keep);
            keep
        });

        self.rooms.retain(|_, r| {
            let keep = r.expire > now;
            removed += u64::from(!keep);
            keep
        });

        Ok(removed)
    }
}

#[cfg(test)]
mod test {
    use couch_core::{Permissions, Playback};

    use crate::{DatabaseError, DatabaseResult};

    use super::*;

    fn client(socket: &str, membership: Membership) -> ClientData {
        ClientData {
            socket: socket.to_string(),
            name: None,
            membership,
            expire: now() + 60.,
        }
    }

    fn in_room(room_id: &str, joined: f64) -> Membership {
        Membership::InRoom {
            room_id: room_id.to_string(),
            joined,
            admin: false,
            synced: None,
        }
    }

    fn room(id: &str, expire: f64) -> RoomData {
        RoomData {
            id: id.to_string(),
            secret: "secret".to_string(),
            name: "Room".to_string(),
            media: vec![],
            playback: Playback::Unloaded,
            admins_only: Permissions::default(),
            created: 0.,
            expire,
        }
    }

    #[tokio::test]
    async fn test_update_is_conditional() {
        let db = MemoryDatabase::new();

        let result = db
            .update_client("ghost", &[ClientField::Name(Some("Ghost".to_string()))])
            .await;

        assert!(
            matches!(result, Err(DatabaseError::ConditionFailed { .. })),
            "updating a missing client should fail its condition"
        );
        assert!(
            db.client("ghost").await.optional().unwrap().is_none(),
            "a failed update should not create a record"
        );

        db.put_client(client("abc", Membership::None)).await.unwrap();
        let updated = db
            .update_client(
                "abc",
                &[
                    ClientField::Name(Some("Ana".to_string())),
                    ClientField::Membership(in_room("r1", 5.)),
                    ClientField::Synced(Some(12.)),
                ],
            )
            .await
            .unwrap();

        assert_eq!(updated.name.as_deref(), Some("Ana"));
        assert_eq!(updated.membership.room_id(), Some("r1"));
        assert_eq!(
            updated.membership.synced(),
            Some(12.),
            "fields should apply in order"
        );
    }

    #[tokio::test]
    async fn test_clients_in_room_are_ordered_by_join() {
        let db = MemoryDatabase::new();

        db.put_client(client("late", in_room("r1", 20.))).await.unwrap();
        db.put_client(client("early", in_room("r1", 10.))).await.unwrap();
        db.put_client(client("tied", in_room("r1", 20.))).await.unwrap();
        db.put_client(client("other", in_room("r2", 1.))).await.unwrap();
        db.put_client(client("lobby", Membership::None)).await.unwrap();

        let sockets: Vec<_> = db
            .clients_in_room("r1")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.socket)
            .collect();

        assert_eq!(sockets, vec!["early", "late", "tied"]);
    }

    #[tokio::test]
    async fn test_expired_records() {
        let db = MemoryDatabase::new();

        db.put_room(room("old", now() - 1.)).await.unwrap();
        db.put_room(room("new", now() + 60.)).await.unwrap();

        assert!(
            db.room("old", Consistency::Strong)
                .await
                .optional()
                .unwrap()
                .is_none(),
            "expired rooms should not be readable"
        );
        assert!(
            db.update_room("old", &[RoomField::Name("x".to_string())])
                .await
                .is_err(),
            "expired rooms should not be updatable"
        );

        assert_eq!(db.clear_expired(now()).await.unwrap(), 1);
        assert!(db.room("new", Consistency::Eventual).await.is_ok());
    }
}
