mod client;
mod lifecycle;
mod media;
mod payment;
mod room;

use couch_core::Command;

use crate::{CollabResult, Database, Request};

/// Runs the handler for a command
pub(crate) async fn dispatch<Db>(request: &mut Request<'_, Db>, command: Command) -> CollabResult<()>
where
    Db: Database,
{
    match command {
        Command::Connect { .. } => lifecycle::connect(request).await,
        Command::Disconnect { .. } => lifecycle::disconnect(request).await,

        Command::ClientJoin {
            room_id,
            room_secret,
            client_name,
        } => client::join(request, room_id, room_secret, client_name).await,
        Command::ClientLeave { room_id } => client::leave(request, room_id).await,
        Command::ClientName { client_name } => client::name(request, client_name).await,
        Command::ClientSynced { client_synced } => client::synced(request, client_synced).await,
        Command::ClientFeedback {
            feedback,
            user_agent,
            email,
        } => client::feedback(request, feedback, user_agent, email).await,

        Command::RoomCreate {
            client_name,
            room_id_copy,
            room_name,
        } => room::create(request, client_name, room_id_copy, room_name).await,
        Command::RoomDelete {
            room_id,
            room_secret,
        } => room::delete(request, room_id, room_secret).await,
        Command::RoomName { room_id, room_name } => room::name(request, room_id, room_name).await,
        Command::RoomMessage { room_id, message } => room::message(request, room_id, message).await,
        Command::RoomAdminsOnly {
            room_id,
            action,
            admins_only,
        } => room::admins_only(request, room_id, action, admins_only).await,

        Command::RoomMediaAdd {
            room_id,
            name,
            kind,
            content,
        } => media::add(request, room_id, name, kind, content).await,
        Command::RoomMediaRearrange {
            room_id,
            media_id,
            media_id_after,
        } => media::rearrange(request, room_id, media_id, media_id_after).await,
        Command::RoomMediaPlay { room_id, start } => media::play(request, room_id, start).await,
        Command::RoomMediaPause { room_id, paused } => media::pause(request, room_id, paused).await,
        Command::RoomMediaLoad { room_id, media_id } => {
            media::load(request, room_id, media_id).await
        }
        Command::RoomMediaRemove { room_id, media_id } => {
            media::remove(request, room_id, media_id).await
        }

        Command::PaymentSession { amount, return_url } => {
            payment::session(request, amount, return_url).await
        }
        Command::PaymentPaid { email } => payment::paid(request, email).await,
    }
}
