use std::sync::Arc;

use couch_collab::Collab;

use crate::WebSocketManager;

/// The state shared by every route
pub struct ServerContext<Db> {
    pub collab: Arc<Collab<Db>>,
    pub websockets: Arc<WebSocketManager>,
}

// Derived Clone would require Db: Clone
impl<Db> Clone for ServerContext<Db> {
    fn clone(&self) -> Self {
        Self {
            collab: self.collab.clone(),
            websockets: self.websockets.clone(),
        }
    }
}
