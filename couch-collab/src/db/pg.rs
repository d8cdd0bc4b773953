use async_trait::async_trait;
use couch_core::{
    AdminsOnly, ClientData, MediaItem, Membership, Permissions, Playback, RoomData, Timestamp,
};
use sqlx::{
    postgres::PgPoolOptions, query, query_as, query_builder::Separated, types::Json,
    Error as SqlxError, FromRow, PgPool, Postgres, QueryBuilder,
};

use crate::{
    client_condition_failed, client_not_found, room_condition_failed, room_not_found,
    util::now, ClientField, Consistency, Database, DatabaseError, Result, RoomField,
};

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS couch_clients (
        socket TEXT PRIMARY KEY,
        seq BIGSERIAL,
        name TEXT,
        room_id TEXT,
        room_joined DOUBLE PRECISION NOT NULL DEFAULT 0,
        room_admin BOOLEAN NOT NULL DEFAULT FALSE,
        room_synced DOUBLE PRECISION,
        expire DOUBLE PRECISION NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS couch_clients_by_room
        ON couch_clients (room_id, room_joined, seq)",
    "CREATE TABLE IF NOT EXISTS couch_rooms (
        id TEXT PRIMARY KEY,
        secret TEXT NOT NULL,
        name TEXT NOT NULL,
        media JSONB NOT NULL,
        playback JSONB NOT NULL,
        admins_only_dj BOOLEAN NOT NULL,
        admins_only_see_clients BOOLEAN NOT NULL,
        admins_only_chat BOOLEAN NOT NULL,
        created DOUBLE PRECISION NOT NULL,
        expire DOUBLE PRECISION NOT NULL
    )",
];

/// Helper trait to reduce boilerplate
trait IntoDatabaseError {
    fn any(self) -> DatabaseError;
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }
}

/// A postgres database implementation for couch
pub struct PgDatabase {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct ClientRow {
    socket: String,
    name: Option<String>,
    /// Null when the client is not in a room
    room_id: Option<String>,
    room_joined: f64,
    room_admin: bool,
    room_synced: Option<f64>,
    expire: f64,
}

#[derive(Debug, FromRow)]
struct RoomRow {
    id: String,
    secret: String,
    name: String,
    media: Json<Vec<MediaItem>>,
    playback: Json<Playback>,
    admins_only_dj: bool,
    admins_only_see_clients: bool,
    admins_only_chat: bool,
    created: f64,
    expire: f64,
}

impl From<ClientRow> for ClientData {
    fn from(row: ClientRow) -> Self {
        let membership = match row.room_id {
            Some(room_id) => Membership::InRoom {
                room_id,
                joined: row.room_joined,
                admin: row.room_admin,
                synced: row.room_synced,
            },
            None => Membership::None,
        };

        Self {
            socket: row.socket,
            name: row.name,
            membership,
            expire: row.expire,
        }
    }
}

impl From<RoomRow> for RoomData {
    fn from(row: RoomRow) -> Self {
        Self {
            id: row.id,
            secret: row.secret,
            name: row.name,
            media: row.media.0,
            playback: row.playback.0,
            admins_only: Permissions {
                dj: row.admins_only_dj,
                see_clients: row.admins_only_see_clients,
                chat: row.admins_only_chat,
            },
            created: row.created,
            expire: row.expire,
        }
    }
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| e.any())?;

        for statement in SCHEMA {
            query(statement)
                .execute(&pool)
                .await
                .map_err(|e| e.any())?;
        }

        Ok(Self { pool })
    }
}

fn push_membership<'args>(
    set: &mut Separated<'_, 'args, Postgres, &'static str>,
    membership: &Membership,
) {
    match membership {
        Membership::None => {
            set.push("room_id = NULL");
            set.push("room_joined = 0");
            set.push("room_admin = FALSE");
            set.push("room_synced = NULL");
        }
        Membership::InRoom {
            room_id,
            joined,
            admin,
            synced,
        } => {
            set.push("room_id = ").push_bind_unseparated(room_id.clone());
            set.push("room_joined = ").push_bind_unseparated(*joined);
            set.push("room_admin = ").push_bind_unseparated(*admin);
            set.push("room_synced = ").push_bind_unseparated(*synced);
        }
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn client(&self, socket: &str) -> Result<ClientData> {
        query_as::<_, ClientRow>("SELECT * FROM couch_clients WHERE socket = $1 AND expire > $2")
            .bind(socket)
            .bind(now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| e.any())?
            .map(ClientData::from)
            .ok_or_else(|| client_not_found(socket))
    }

    async fn put_client(&self, client: ClientData) -> Result<()> {
        let (room_id, joined, admin, synced) = match client.membership {
            Membership::None => (None, 0., false, None),
            Membership::InRoom {
                room_id,
                joined,
                admin,
                synced,
            } => (Some(room_id), joined, admin, synced),
        };

        query(
            "INSERT INTO couch_clients
                (socket, name, room_id, room_joined, room_admin, room_synced, expire)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (socket) DO UPDATE SET
                name = EXCLUDED.name,
                room_id = EXCLUDED.room_id,
                room_joined = EXCLUDED.room_joined,
                room_admin = EXCLUDED.room_admin,
                room_synced = EXCLUDED.room_synced,
                expire = EXCLUDED.expire",
        )
        .bind(client.socket)
        .bind(client.name)
        .bind(room_id)
        .bind(joined)
        .bind(admin)
        .bind(synced)
        .bind(client.expire)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())
        .map(|_| ())
    }

    async fn update_client(&self, socket: &str, fields: &[ClientField]) -> Result<ClientData> {
        if fields.is_empty() {
            return self
                .client(socket)
                .await
                .map_err(|_| client_condition_failed(socket));
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE couch_clients SET ");
        let mut set = builder.separated(", ");

        for field in fields {
            match field {
                ClientField::Name(name) => {
                    set.push("name = ").push_bind_unseparated(name.clone());
                }
                ClientField::Membership(membership) => push_membership(&mut set, membership),
                ClientField::Synced(synced) => {
                    set.push("room_synced = ").push_bind_unseparated(*synced);
                }
            }
        }

        builder
            .push(" WHERE socket = ")
            .push_bind(socket.to_string())
            .push(" AND expire > ")
            .push_bind(now())
            .push(" RETURNING *");

        builder
            .build_query_as::<ClientRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| e.any())?
            .map(ClientData::from)
            .ok_or_else(|| client_condition_failed(socket))
    }

    async fn delete_client(&self, socket: &str) -> Result<()> {
        query("DELETE FROM couch_clients WHERE socket = $1")
            .bind(socket)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clients_in_room(&self, room_id: &str) -> Result<Vec<ClientData>> {
        let rows = query_as::<_, ClientRow>(
            "SELECT * FROM couch_clients
            WHERE room_id = $1 AND expire > $2
            ORDER BY room_joined, seq",
        )
        .bind(room_id)
        .bind(now())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(ClientData::from).collect())
    }

    async fn room(&self, room_id: &str, _consistency: Consistency) -> Result<RoomData> {
        query_as::<_, RoomRow>("SELECT * FROM couch_rooms WHERE id = $1 AND expire > $2")
            .bind(room_id)
            .bind(now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| e.any())?
            .map(RoomData::from)
            .ok_or_else(|| room_not_found(room_id))
    }

    async fn put_room(&self, room: RoomData) -> Result<()> {
        query(
            "INSERT INTO couch_rooms
                (id, secret, name, media, playback, admins_only_dj, admins_only_see_clients,
                admins_only_chat, created, expire)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                secret = EXCLUDED.secret,
                name = EXCLUDED.name,
                media = EXCLUDED.media,
                playback = EXCLUDED.playback,
                admins_only_dj = EXCLUDED.admins_only_dj,
                admins_only_see_clients = EXCLUDED.admins_only_see_clients,
                admins_only_chat = EXCLUDED.admins_only_chat,
                created = EXCLUDED.created,
                expire = EXCLUDED.expire",
        )
        .bind(room.id)
        .bind(room.secret)
        .bind(room.name)
        .bind(Json(room.media))
        .bind(Json(room.playback))
        .bind(room.admins_only.dj)
        .bind(room.admins_only.see_clients)
        .bind(room.admins_only.chat)
        .bind(room.created)
        .bind(room.expire)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())
        .map(|_| ())
    }

    async fn update_room(&self, room_id: &str, fields: &[RoomField]) -> Result<RoomData> {
        if fields.is_empty() {
            return self
                .room(room_id, Consistency::Strong)
                .await
                .map_err(|_| room_condition_failed(room_id));
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE couch_rooms SET ");
        let mut set = builder.separated(", ");

        for field in fields {
            match field {
                RoomField::Name(name) => {
                    set.push("name = ").push_bind_unseparated(name.clone());
                }
                RoomField::Playlist(playlist) => {
                    set.push("media = ")
                        .push_bind_unseparated(Json(playlist.media.clone()));
                    set.push("playback = ")
                        .push_bind_unseparated(Json(playlist.playback));
                }
                RoomField::AdminsOnly(action, admins_only) => {
                    set.push(format!("{} = ", admins_only_column(*action)))
                        .push_bind_unseparated(*admins_only);
                }
            }
        }

        builder
            .push(" WHERE id = ")
            .push_bind(room_id.to_string())
            .push(" AND expire > ")
            .push_bind(now())
            .push(" RETURNING *");

        builder
            .build_query_as::<RoomRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| e.any())?
            .map(RoomData::from)
            .ok_or_else(|| room_condition_failed(room_id))
    }

    async fn delete_room(&self, room_id: &str) -> Result<()> {
        query("DELETE FROM couch_rooms WHERE id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired(&self, now: Timestamp) -> Result<u64> {
        let mut removed = 0;

        for statement in [
            "DELETE FROM couch_clients WHERE expire <= $1",
            "DELETE FROM couch_rooms WHERE expire <= $1",
        ] {
            removed += query(statement)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(|e| e.any())?
                .rows_affected();
        }

        Ok(removed)
    }
}

fn admins_only_column(action: AdminsOnly) -> &'static str {
    match action {
        AdminsOnly::Dj => "admins_only_dj",
        AdminsOnly::SeeClients => "admins_only_see_clients",
        AdminsOnly::Chat => "admins_only_chat",
    }
}
