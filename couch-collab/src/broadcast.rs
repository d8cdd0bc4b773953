use couch_core::{ClientData, ConnectionId, RequestError, Roster};
use futures_util::future::{join, join_all};
use log::warn;

use crate::{CollabResult, Database, Outbound, Request, Transport, TransportError};

/// Delivers a message to a single connection, treating a closed connection as delivered
pub(crate) async fn deliver(
    transport: &dyn Transport,
    socket: &str,
    message: &Outbound,
) -> CollabResult<()> {
    match transport.send(socket, message.to_text()?).await {
        Ok(()) | Err(TransportError::Gone(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl<Db> Request<'_, Db>
where
    Db: Database,
{
    /// Sends a message to every given connection.
    ///
    /// Every delivery is attempted even if some fail. If any failed, one of the
    /// failures is returned as a client error once all deliveries are done.
    pub async fn send(
        &self,
        sockets: impl IntoIterator<Item = ConnectionId>,
        message: &Outbound,
    ) -> CollabResult<()> {
        let text = message.to_text()?;
        let transport = &self.context().transport;

        let deliveries = sockets.into_iter().map(|socket| {
            let text = text.clone();
            async move { transport.send(&socket, text).await }
        });

        let mut failure = None;

        for result in join_all(deliveries).await {
            match result {
                // The membership read was stale, and the record will expire anyway
                Ok(()) | Err(TransportError::Gone(_)) => {}
                Err(e) => {
                    warn!("Failed to deliver message: {}", e);
                    failure = Some(e);
                }
            }
        }

        match failure {
            Some(e) => Err(RequestError::client_error(e.to_string()).into()),
            None => Ok(()),
        }
    }

    /// Sends a message back to the sender
    pub async fn reply(&self, message: &Outbound) -> CollabResult<()> {
        deliver(self.context().transport.as_ref(), self.sender(), message).await
    }

    /// Returns the clients in the sender's room, in the order they joined
    pub async fn room_membership(&mut self, exclude_self: bool) -> CollabResult<Vec<ClientData>> {
        let client = self.client().await?;

        let Some(room_id) = client.membership.room_id() else {
            return Ok(vec![]);
        };

        let mut clients = self.database().clients_in_room(room_id).await?;

        if exclude_self {
            clients.retain(|c| c.socket != self.sender());
        }

        Ok(clients)
    }

    /// Returns the connections of every client in a room
    pub async fn room_sockets(&self, room_id: &str) -> CollabResult<Vec<ConnectionId>> {
        let clients = self.database().clients_in_room(room_id).await?;

        Ok(clients.into_iter().map(|c| c.socket).collect())
    }

    /// Sends the room's public state to everyone in it
    pub async fn broadcast_room_state(&mut self) -> CollabResult<()> {
        let room = self.require_room().await?;
        let sockets = self.room_sockets(&room.id).await?;

        self.send(sockets, &Outbound::RoomState(room.state())).await
    }

    /// Sends everyone in the sender's room who is in it, as their role is allowed to see it.
    /// Does nothing if the sender is not in a room.
    pub async fn broadcast_room_clients(&mut self, exclude_self: bool) -> CollabResult<()> {
        let Some(room) = self.room().await? else {
            return Ok(());
        };

        let clients = self.room_membership(exclude_self).await?;
        let roster = Roster::from_clients(
            clients,
            room.admins_only.see_clients,
            self.context().config.display_limit,
        );

        let to_admins = Outbound::RoomClients {
            room_id: room.id.clone(),
            clients: roster.admin_view,
        };
        let to_guests = Outbound::RoomClients {
            room_id: room.id,
            clients: roster.guest_view,
        };

        let (admins, guests) = join(
            self.send(roster.admin_sockets, &to_admins),
            self.send(roster.guest_sockets, &to_guests),
        )
        .await;

        admins.and(guests)
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use crate::testing::TestCollab;

    use super::*;

    #[tokio::test]
    async fn test_send_continues_past_failures() {
        let test = TestCollab::new();
        test.transport.mark_gone("gone");
        test.transport.mark_broken("broken");

        let request = Request::new(test.context(), "a");
        let sockets = ["a", "gone", "broken", "b"].map(String::from);
        let result = request
            .send(sockets, &Outbound::PaymentPaid(false))
            .await;

        assert!(
            matches!(
                result,
                Err(crate::CollabError::Request(RequestError::ClientError(_)))
            ),
            "a failed delivery should surface as a client error"
        );
        assert_eq!(
            test.transport.take("b"),
            vec![json!({ "type": "payment_paid", "info": false })],
            "deliveries after a failure should still happen"
        );
        assert_eq!(test.transport.take("a").len(), 1);
    }

    #[tokio::test]
    async fn test_gone_is_not_a_failure() {
        let test = TestCollab::new();
        test.transport.mark_gone("gone");

        let request = Request::new(test.context(), "gone");

        assert!(request.reply(&Outbound::PaymentPaid(true)).await.is_ok());
        assert!(request
            .send(vec!["gone".to_string()], &Outbound::PaymentPaid(true))
            .await
            .is_ok());
    }
}
