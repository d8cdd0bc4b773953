use couch_core::{ClientData, Membership};
use log::info;

use crate::{util::now, CollabResult, Database, Request};

/// Creates the record of a connection that just opened
pub async fn connect<Db: Database>(request: &mut Request<'_, Db>) -> CollabResult<()> {
    let config = &request.context().config;

    let client = ClientData {
        socket: request.sender().to_string(),
        name: None,
        membership: Membership::None,
        expire: config.client_expiry(now()),
    };

    request.database().put_client(client).await?;
    info!("Connection {} opened", request.sender());

    Ok(())
}

/// Lets the rest of the room know a connection closed, then forgets it.
/// Closing is not guaranteed to be seen, which is why client records expire.
pub async fn disconnect<Db: Database>(request: &mut Request<'_, Db>) -> CollabResult<()> {
    let broadcast = match request.try_client().await? {
        Some(_) => request.broadcast_room_clients(true).await,
        None => Ok(()),
    };

    // The record goes even if the room could not be told
    request.database().delete_client(request.sender()).await?;
    info!("Connection {} closed", request.sender());

    broadcast
}
