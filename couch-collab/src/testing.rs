use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::{
    Collab, CollabContext, MemoryDatabase, Notice, NoticeKind, Notifier, NotifyError,
    PaymentGateway, Transport, TransportError,
};

/// A transport that keeps every message sent to a connection
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<HashMap<String, Vec<String>>>,
    gone: Mutex<HashSet<String>>,
    broken: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    /// Makes sends to this connection fail as if it closed
    pub fn mark_gone(&self, socket: &str) {
        self.gone.lock().insert(socket.to_string());
    }

    /// Makes sends to this connection fail for any other reason
    pub fn mark_broken(&self, socket: &str) {
        self.broken.lock().insert(socket.to_string());
    }

    /// Returns and forgets everything sent to a connection so far
    pub fn take(&self, socket: &str) -> Vec<Value> {
        self.sent
            .lock()
            .remove(socket)
            .unwrap_or_default()
            .iter()
            .map(|text| serde_json::from_str(text).expect("outbound messages are json"))
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, socket: &str, text: String) -> Result<(), TransportError> {
        if self.gone.lock().contains(socket) {
            return Err(TransportError::Gone(socket.to_string()));
        }

        if self.broken.lock().contains(socket) {
            return Err(TransportError::Other {
                socket: socket.to_string(),
                reason: "broken pipe".to_string(),
            });
        }

        self.sent
            .lock()
            .entry(socket.to_string())
            .or_default()
            .push(text);

        Ok(())
    }
}

/// A notifier that keeps every notice
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeKind, Notice)>>,
}

impl RecordingNotifier {
    /// Returns and forgets every notice of a kind
    pub fn take(&self, kind: NoticeKind) -> Vec<Notice> {
        let mut notices = self.notices.lock();
        let (taken, kept): (Vec<_>, Vec<_>) = notices.drain(..).partition(|(k, _)| *k == kind);
        *notices = kept;

        taken.into_iter().map(|(_, notice)| notice).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, kind: NoticeKind, notice: Notice) -> Result<(), NotifyError> {
        self.notices.lock().push((kind, notice));
        Ok(())
    }
}

/// A collab system backed by memory, recording everything it sends
pub struct TestCollab {
    pub collab: Collab<MemoryDatabase>,
    pub transport: Arc<RecordingTransport>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestCollab {
    pub fn new() -> Self {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let collab = Collab::new(
            MemoryDatabase::default(),
            transport.clone(),
            notifier.clone(),
        );

        Self {
            collab,
            transport,
            notifier,
        }
    }

    pub fn with_payments(gateway: Arc<dyn PaymentGateway>) -> Self {
        let test = Self::new();

        Self {
            collab: test.collab.with_payments(gateway),
            ..test
        }
    }

    pub fn context(&self) -> &CollabContext<MemoryDatabase> {
        &self.collab.context
    }

    pub async fn connect(&self, socket: &str) {
        self.collab
            .connect(socket)
            .await
            .expect("connecting should work");
    }

    /// Sends a message as a connection. Faults are left to the replies and notices.
    pub async fn send(&self, socket: &str, message: Value) {
        let _ = self
            .collab
            .handle_message(socket, &message.to_string())
            .await;
    }

    /// Connects and creates a room as its admin, returning the room id and secret
    pub async fn create_room(&self, socket: &str) -> (String, String) {
        self.connect(socket).await;
        self.send(
            socket,
            json!({ "type": "room_create", "info": { "client_name": null, "room_id_copy": null, "room_name": null } }),
        )
        .await;

        let replies = self.transport.take(socket);
        let info = &replies[0]["info"];

        (
            info["room"]["id"].as_str().unwrap().to_string(),
            info["secret"].as_str().unwrap().to_string(),
        )
    }

    /// Connects and joins a room as a guest
    pub async fn join(&self, socket: &str, room_id: &str) {
        self.connect(socket).await;
        self.send(
            socket,
            json!({ "type": "client_join", "info": { "room_id": room_id, "room_secret": null, "client_name": null } }),
        )
        .await;
    }
}
