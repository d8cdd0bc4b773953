mod context;
mod errors;
mod gateway;
mod sockets;
mod sweeper;

use std::{
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::{routing::get, Router};
use couch_collab::{Collab, Database};
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use context::*;
pub use errors::*;
pub use sockets::*;
pub use sweeper::*;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

/// Starts the couch server, accepting websocket connections on `/v1/gateway`
pub async fn run_server<Db>(context: ServerContext<Db>, port: u16) -> ServerResult<()>
where
    Db: Database,
{
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new().route("/gateway", get(gateway::upgrade::<Db>));

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { port, source })?;

    info!("Listening on port {}", port);

    axum::serve(listener, root_router)
        .await
        .map_err(ServerError::Serve)
}

/// Creates a context whose collab system delivers through its websocket manager
pub fn create_context<Db, F>(build: F) -> ServerContext<Db>
where
    Db: Database,
    F: FnOnce(Arc<WebSocketManager>) -> Collab<Db>,
{
    let websockets = Arc::new(WebSocketManager::default());
    let collab = Arc::new(build(websockets.clone()));

    ServerContext { collab, websockets }
}
