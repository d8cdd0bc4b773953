use couch_core::{AdminsOnly, RequestError};

use crate::{CollabResult, Database, Request};

/// What a client needs to do something in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Being in the room is enough
    Member,
    /// Members may do it unless the room restricts the action to admins
    Action(AdminsOnly),
    /// Only admins may do it
    Admin,
}

impl<Db> Request<'_, Db>
where
    Db: Database,
{
    /// Checks that the sender is in the room it expects to be in, and may do what it asks.
    ///
    /// Clients always name the room they mean, so a request that was meant for a
    /// room the client has since left is rejected instead of applied to the new one.
    pub async fn check_permission(
        &mut self,
        expected_room_id: &str,
        permission: Permission,
    ) -> CollabResult<()> {
        let client = self.client().await?;

        if client.membership.room_id() != Some(expected_room_id) {
            return Err(RequestError::client_confused(
                "Client in different room to what they expect",
            )
            .into());
        }

        if client.membership.is_admin() {
            return Ok(());
        }

        let allowed = match permission {
            Permission::Member => true,
            Permission::Admin => false,
            // The room is only fetched when a flag has to be checked
            Permission::Action(action) => !self.require_room().await?.admins_only.get(action),
        };

        if !allowed {
            return Err(RequestError::client_confused("Only admins can do that").into());
        }

        Ok(())
    }
}
