use serde::{Deserialize, Serialize};

use crate::{ClientData, ConnectionId};

/// A client as shown to other members of a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub socket: ConnectionId,
    pub name: Option<String>,
    pub admin: bool,
    pub synced: Option<f64>,
}

/// Who is in a room, as seen by one role
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RosterView {
    pub admins: Vec<RosterEntry>,
    pub guests: Vec<RosterEntry>,
    /// If true, the viewer is not allowed to see who is in the room
    pub hidden: bool,
    /// If true, not everyone in the room is listed
    pub limited: bool,
    /// How many clients are in the room, listed or not
    pub total: usize,
}

impl RosterView {
    /// A view that reveals nothing but the number of clients
    pub fn hidden(total: usize) -> Self {
        Self {
            hidden: true,
            total,
            ..Default::default()
        }
    }
}

/// The membership of a room, computed once and fanned out per role
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    pub admin_view: RosterView,
    pub guest_view: RosterView,
    /// Every admin connection, regardless of the display limit
    pub admin_sockets: Vec<ConnectionId>,
    /// Every guest connection, regardless of the display limit
    pub guest_sockets: Vec<ConnectionId>,
}

impl Roster {
    /// Builds a roster from clients in join order.
    /// Admins are listed before guests when the display limit kicks in.
    pub fn from_clients(
        clients: impl IntoIterator<Item = ClientData>,
        hidden_from_guests: bool,
        display_limit: usize,
    ) -> Self {
        let mut admins = vec![];
        let mut guests = vec![];

        for client in clients {
            let entry = RosterEntry {
                admin: client.membership.is_admin(),
                synced: client.membership.synced(),
                socket: client.socket,
                name: client.name,
            };

            if entry.admin {
                admins.push(entry);
            } else {
                guests.push(entry);
            }
        }

        let total = admins.len() + guests.len();
        let admin_sockets = admins.iter().map(|e| e.socket.clone()).collect();
        let guest_sockets = guests.iter().map(|e| e.socket.clone()).collect();

        admins.truncate(display_limit);
        guests.truncate(display_limit.saturating_sub(admins.len()));

        let admin_view = RosterView {
            admins,
            guests,
            hidden: false,
            limited: total > display_limit,
            total,
        };

        let guest_view = if hidden_from_guests {
            RosterView::hidden(total)
        } else {
            admin_view.clone()
        };

        Self {
            admin_view,
            guest_view,
            admin_sockets,
            guest_sockets,
        }
    }

    /// Returns the view for a client of the given role
    pub fn view_for(&self, admin: bool) -> &RosterView {
        if admin {
            &self.admin_view
        } else {
            &self.guest_view
        }
    }
}
