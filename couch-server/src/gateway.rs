use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use couch_collab::Database;
use couch_core::random_token;
use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use serde_json::json;
use tokio::task::JoinHandle;

use crate::context::ServerContext;

/// Length of connection and request ids
const ID_LENGTH: usize = 16;

pub async fn upgrade<Db: Database>(
    ws: WebSocketUpgrade,
    State(context): State<ServerContext<Db>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, context))
}

async fn handle_socket<Db: Database>(socket: WebSocket, context: ServerContext<Db>) {
    let id = random_token(ID_LENGTH);
    let mut outgoing = context.websockets.register_connection(&id);

    let (mut sink, mut incoming) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(message) = outgoing.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    if context.collab.connect(&id).await.is_err() {
        // Without a record nothing the client sends could be handled
        send_fault(&context, &id);
        context.websockets.unregister_connection(&id);

        // The fault is flushed before the socket is dropped
        finish_writer(&id, writer).await;

        return;
    }

    while let Some(result) = incoming.next().await {
        match result {
            Ok(Message::Text(body)) => {
                let context = context.clone();
                let id = id.clone();

                // Messages are independent of each other, so a slow one shouldn't hold up the rest
                tokio::spawn(async move { handle_text(&context, &id, body).await });
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Connection {} errored: {}", id, e);
                break;
            }
        }
    }

    if context.collab.disconnect(&id).await.is_err() {
        warn!("Connection {} closed uncleanly", id);
    }

    context.websockets.unregister_connection(&id);
    writer.abort();
}

async fn handle_text<Db: Database>(context: &ServerContext<Db>, id: &str, body: String) {
    if !body.starts_with('{') {
        let reply = time_sync_reply(&body, chrono::Utc::now().timestamp_millis());
        context.websockets.push(id, Message::Text(reply));

        return;
    }

    if context.collab.handle_message(id, &body).await.is_err() {
        send_fault(context, id);
    }
}

/// Echoes a client's time sync timestamp back with the server time in ms appended on its own line
fn time_sync_reply(body: &str, now: i64) -> String {
    format!("{body}\n{now}")
}

/// Waits for a connection's writer to drain, returning whether it stopped cleanly
async fn finish_writer(id: &str, writer: JoinHandle<()>) -> bool {
    match writer.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Writer of connection {} failed: {}", id, e);
            false
        }
    }
}

/// Tells a client its message could not be handled. The fault itself was already reported.
fn send_fault<Db>(context: &ServerContext<Db>, id: &str) {
    let message = fault_message(id, &random_token(ID_LENGTH));
    context.websockets.push(id, Message::Text(message));
}

fn fault_message(connection_id: &str, request_id: &str) -> String {
    json!({
        "message": "Internal server error",
        "connectionId": connection_id,
        "requestId": request_id,
    })
    .to_string()
}
