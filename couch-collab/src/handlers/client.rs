use couch_core::{Membership, Roster};

use crate::{
    util::now, ClientField, CollabResult, Consistency, Database, DatabaseResult, Notice,
    NoticeKind, Outbound, Permission, Request,
};

/// How much of the feedback ends up in the subject line
const SUBJECT_LENGTH: usize = 50;

pub async fn join<Db: Database>(
    request: &mut Request<'_, Db>,
    room_id: String,
    secret: Option<String>,
    client_name: Option<String>,
) -> CollabResult<()> {
    let room = request
        .database()
        .room(&room_id, Consistency::Eventual)
        .await
        .optional()?;

    let Some(room) = room else {
        // So the client can give up and forget about the room
        return request.reply(&Outbound::RoomInvalid { room_id }).await;
    };

    let admin = secret.as_deref() == Some(room.secret.as_str());

    // A stale secret still lets the client in as a guest
    if secret.is_some() && !admin {
        request
            .reply(&Outbound::SecretInvalid {
                room_id: room_id.clone(),
            })
            .await?;
    }

    request.seed_room(room.clone());
    request
        .update_client(&[
            ClientField::Name(client_name),
            ClientField::Membership(Membership::InRoom {
                room_id,
                joined: now(),
                admin,
                synced: None,
            }),
        ])
        .await?;

    let clients = request.room_membership(false).await?;
    let roster = Roster::from_clients(
        clients,
        room.admins_only.see_clients,
        request.context().config.display_limit,
    );

    request
        .reply(&Outbound::RoomJoined {
            room: room.state(),
            clients: roster.view_for(admin).clone(),
            admin,
            you: request.sender().to_string(),
        })
        .await?;

    request.broadcast_room_clients(false).await
}

pub async fn leave<Db: Database>(request: &mut Request<'_, Db>, room_id: String) -> CollabResult<()> {
    request.check_permission(&room_id, Permission::Member).await?;

    // Has to happen while the client is still in the room
    request.broadcast_room_clients(true).await?;

    request
        .update_client(&[ClientField::Membership(Membership::None)])
        .await?;

    Ok(())
}

pub async fn name<Db: Database>(
    request: &mut Request<'_, Db>,
    client_name: Option<String>,
) -> CollabResult<()> {
    request
        .update_client(&[ClientField::Name(client_name)])
        .await?;

    request.broadcast_room_clients(false).await
}

pub async fn synced<Db: Database>(
    request: &mut Request<'_, Db>,
    client_synced: Option<f64>,
) -> CollabResult<()> {
    request
        .update_client(&[ClientField::Synced(client_synced)])
        .await?;

    request.broadcast_room_clients(false).await
}

pub async fn feedback<Db: Database>(
    request: &mut Request<'_, Db>,
    feedback: String,
    user_agent: String,
    email: Option<String>,
) -> CollabResult<()> {
    let notice = Notice {
        subject: feedback_subject(&feedback),
        body: format!(
            "Email: {}\n\nUA: {}\n\n{}",
            email.as_deref().unwrap_or("none"),
            user_agent,
            feedback
        ),
    };

    request
        .context()
        .notifier
        .notify(NoticeKind::Feedback, notice)
        .await?;

    Ok(())
}

fn feedback_subject(feedback: &str) -> String {
    let start: String = feedback.chars().take(SUBJECT_LENGTH).collect();

    format!("Feedback: {}...", start.replace('\n', " "))
}
