use couch_core::{
    random_token, AdminsOnly, Membership, Permissions, RequestError, RoomData, RosterView,
};
use log::info;

use crate::{
    html, names::random_room_name, util::now, ChatMessage, ClientField, CollabError, CollabResult,
    Consistency, Database, DatabaseResult, Outbound, Permission, Request, RoomField,
};

/// Creates a room, optionally copying the name and playlist of another, and makes the sender its admin
pub async fn create<Db: Database>(
    request: &mut Request<'_, Db>,
    client_name: Option<String>,
    copy_id: Option<String>,
    room_name: Option<String>,
) -> CollabResult<()> {
    let config = request.context().config.clone();

    // A room that can't be copied still gets created, just blank
    let copy = match copy_id {
        Some(copy_id) => request
            .database()
            .room(&copy_id, Consistency::Strong)
            .await
            .optional()?,
        None => None,
    };

    let id = random_token(config.room_id_length);
    let secret = random_token(config.secret_length);
    let created = now();

    let name = match (&copy, room_name) {
        (Some(copy), _) => format!("{} (copy)", copy.name),
        // The client asks for this when it wants a plain name that is still distinguishable
        (None, Some(name)) if name == "Room" => format!("Room {id}"),
        (None, Some(name)) => name,
        (None, None) => random_room_name(),
    };

    let (media, playback) = match copy {
        Some(copy) => (copy.media, copy.playback),
        None => Default::default(),
    };

    let room = RoomData {
        id: id.clone(),
        secret: secret.clone(),
        name,
        media,
        playback,
        admins_only: Permissions::default(),
        created,
        expire: config.room_expiry(created),
    };

    request.database().put_room(room.clone()).await?;
    request.seed_room(room.clone());

    request
        .update_client(&[
            ClientField::Name(client_name),
            ClientField::Membership(Membership::InRoom {
                room_id: id.clone(),
                joined: created,
                admin: true,
                synced: None,
            }),
        ])
        .await?;

    info!("Room {} created by {}", id, request.sender());

    // Only the creator is in it, and the index may not have caught up yet
    let clients = RosterView {
        total: 1,
        ..Default::default()
    };

    request
        .reply(&Outbound::RoomCreated {
            room: room.state(),
            secret,
            clients,
            you: request.sender().to_string(),
        })
        .await
}

/// Deletes a room and kicks everyone out of it. Only needs the secret, not membership.
pub async fn delete<Db: Database>(
    request: &mut Request<'_, Db>,
    room_id: String,
    secret: String,
) -> CollabResult<()> {
    let room = request
        .database()
        .room(&room_id, Consistency::Eventual)
        .await
        .optional()?;

    let Some(room) = room else {
        return request.reply(&Outbound::RoomInvalid { room_id }).await;
    };

    if secret != room.secret {
        return Err(
            RequestError::client_confused("Cannot delete room as you are not an admin").into(),
        );
    }

    // Deleted first so nobody can join while members are being kicked
    request.database().delete_room(&room_id).await?;
    info!("Room {} deleted by {}", room_id, request.sender());

    let invalid = Outbound::RoomInvalid {
        room_id: room_id.clone(),
    };

    let leave = [ClientField::Membership(Membership::None)];
    let mut failure = None;

    // Every member is kicked even if telling one of them fails
    for socket in request.room_sockets(&room_id).await? {
        let sent = request.send([socket.clone()], &invalid).await;

        let left = if socket == request.sender() {
            request.update_client(&leave).await.map(|_| ())
        } else {
            request
                .database()
                .update_client(&socket, &leave)
                .await
                .map(|_| ())
                .map_err(CollabError::from)
        };

        if let Err(e) = sent.and(left) {
            failure.get_or_insert(e);
        }
    }

    request.reply(&invalid).await?;
    failure.map_or(Ok(()), Err)
}

pub async fn name<Db: Database>(
    request: &mut Request<'_, Db>,
    room_id: String,
    room_name: String,
) -> CollabResult<()> {
    request.check_permission(&room_id, Permission::Admin).await?;

    request.update_room(&[RoomField::Name(room_name)]).await?;
    request.broadcast_room_state().await
}

/// Sends a chat message to everyone in the room, the sender included
pub async fn message<Db: Database>(
    request: &mut Request<'_, Db>,
    room_id: String,
    message: String,
) -> CollabResult<()> {
    request
        .check_permission(&room_id, Permission::Action(AdminsOnly::Chat))
        .await?;

    let client = request.client().await?;
    let message = ChatMessage {
        id: random_token(request.context().config.item_id_length),
        room_id: room_id.clone(),
        sender: request.sender().to_string(),
        name: client.name,
        html: html::render_message(&message),
        timestamp: now(),
    };

    let sockets = request.room_sockets(&room_id).await?;
    request.send(sockets, &Outbound::RoomMessage(message)).await
}

pub async fn admins_only<Db: Database>(
    request: &mut Request<'_, Db>,
    room_id: String,
    action: AdminsOnly,
    admins_only: bool,
) -> CollabResult<()> {
    request.check_permission(&room_id, Permission::Admin).await?;

    request
        .update_room(&[RoomField::AdminsOnly(action, admins_only)])
        .await?;
    request.broadcast_room_state().await?;

    // Guests may have just lost or gained the right to see each other
    if action == AdminsOnly::SeeClients {
        request.broadcast_room_clients(false).await?;
    }

    Ok(())
}
