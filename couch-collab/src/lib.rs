mod broadcast;
mod db;
mod errors;
mod handlers;
mod html;
mod names;
mod notify;
mod outbound;
mod payment;
mod permission;
mod request;
mod transport;
mod util;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use couch_core::{Command, Config, InboundMessage, RequestError};
use log::{error, warn};

pub use db::*;
pub use errors::*;
pub use notify::*;
pub use outbound::*;
pub use payment::*;
pub use permission::*;
pub use request::*;
pub use transport::*;
pub use util::now;

/// The couch collab system, keeping rooms and their clients in sync.
///
/// Every message is handled on its own with a fresh [Request], so messages can be
/// handled concurrently. The database is the only shared state.
pub struct Collab<Db> {
    context: CollabContext<Db>,
}

/// A type passed to various components of the collab system, to access state and deliver messages.
pub struct CollabContext<Db> {
    pub config: Arc<Config>,
    pub database: Arc<Db>,
    pub transport: Arc<dyn Transport>,
    pub notifier: Arc<dyn Notifier>,
    /// Payment handlers are only enabled if this is set
    pub payments: Option<Arc<dyn PaymentGateway>>,
}

impl<Db> Collab<Db>
where
    Db: Database,
{
    pub fn new(database: Db, transport: Arc<dyn Transport>, notifier: Arc<dyn Notifier>) -> Self {
        let context = CollabContext {
            config: Default::default(),
            database: Arc::new(database),
            transport,
            notifier,
            payments: None,
        };

        Self { context }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.context.config = Arc::new(config);
        self
    }

    pub fn with_payments(mut self, payments: Arc<dyn PaymentGateway>) -> Self {
        self.context.payments = Some(payments);
        self
    }

    pub fn database(&self) -> &Db {
        &self.context.database
    }

    /// Handles a connection opening
    pub async fn connect(&self, socket: &str) -> CollabResult<()> {
        self.handle(socket, InboundMessage::connect(socket)).await
    }

    /// Handles a connection closing
    pub async fn disconnect(&self, socket: &str) -> CollabResult<()> {
        self.handle(socket, InboundMessage::disconnect(socket)).await
    }

    /// Handles a message body sent by a connection.
    ///
    /// Errors caused by the client are sent back to it and never returned.
    /// Anything returned is a server fault that has already been reported.
    pub async fn handle_message(&self, socket: &str, body: &str) -> CollabResult<()> {
        match InboundMessage::parse(body) {
            Ok(message) => self.handle(socket, message).await,
            Err(error) => {
                self.settle(socket, Received::default(), Err(error.into()))
                    .await
            }
        }
    }

    /// Removes expired records from the database
    pub async fn clear_expired(&self) -> CollabResult<u64> {
        Ok(self.context.database.clear_expired(now()).await?)
    }

    async fn handle(&self, socket: &str, message: InboundMessage) -> CollabResult<()> {
        let received = Received::from(&message);

        let result = match Command::parse(&message) {
            Ok(command) => {
                let mut request = Request::new(&self.context, socket);
                handlers::dispatch(&mut request, command).await
            }
            Err(error) => Err(error.into()),
        };

        self.settle(socket, received, result).await
    }

    /// Decides what happens with the outcome of a message
    async fn settle(
        &self,
        socket: &str,
        received: Received,
        result: CollabResult<()>,
    ) -> CollabResult<()> {
        let error = match result {
            Ok(()) => return Ok(()),
            Err(CollabError::Request(error)) => error,
            Err(fault) => {
                error!("Failed to handle message from {}: {}", socket, fault.chain());
                self.report(fault.chain(), &received).await;

                return Err(fault);
            }
        };

        let report = ErrorReport {
            message: error.message().to_string(),
            received: received.clone(),
        };

        let reply = match error {
            RequestError::ClientError(message) => {
                warn!("Client error from {}: {}", socket, message);
                self.report(message, &received).await;

                Outbound::ClientError(report)
            }
            // Most likely lag, so nothing worth reporting
            RequestError::ClientConfused(_) => Outbound::ClientConfused(report),
        };

        if let Err(e) = broadcast::deliver(self.context.transport.as_ref(), socket, &reply).await {
            warn!("Could not tell {} about its error: {}", socket, e);
        }

        Ok(())
    }

    /// Sends an error to the notifier, logging if that fails too
    async fn report(&self, message: String, received: &Received) {
        let received = serde_json::to_string(received).unwrap_or_default();

        let notice = Notice {
            subject: "couch API error".to_string(),
            body: format!("{message}\n\nReceived: {received}"),
        };

        if let Err(e) = self.context.notifier.notify(NoticeKind::Error, notice).await {
            error!("Could not report error: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use crate::testing::TestCollab;

    use super::*;

    #[tokio::test]
    async fn test_client_errors_are_reported() {
        let test = TestCollab::new();
        test.connect("abc").await;

        let result = test
            .collab
            .handle_message("abc", r#"{"type": "client_name", "info": {"nickname": "x"}}"#)
            .await;

        assert!(result.is_ok(), "client errors should never be returned");
        assert_eq!(
            test.transport.take("abc"),
            vec![json!({
                "type": "client_error",
                "info": {
                    "message": "Unknown fields given: nickname",
                    "received": { "type": "client_name", "info": { "nickname": "x" } },
                },
            })]
        );
        assert_eq!(test.notifier.take(NoticeKind::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_body_has_nothing_received() {
        let test = TestCollab::new();
        test.connect("abc").await;

        test.collab.handle_message("abc", "{oops").await.unwrap();

        assert_eq!(
            test.transport.take("abc"),
            vec![json!({
                "type": "client_error",
                "info": {
                    "message": "Message body is not valid JSON",
                    "received": { "type": null, "info": null },
                },
            })]
        );
    }

    #[tokio::test]
    async fn test_lifecycle_types_are_not_accepted_from_clients() {
        let test = TestCollab::new();
        test.connect("abc").await;

        test.collab
            .handle_message("abc", r#"{"type": "aws_disconnect", "info": {"socket": "other"}}"#)
            .await
            .unwrap();

        assert_eq!(
            test.transport.take("abc")[0]["info"]["message"],
            "Message type 'aws_disconnect' not valid"
        );
        assert!(test.collab.database().client("abc").await.is_ok());
    }

    #[tokio::test]
    async fn test_confused_clients_are_not_reported() {
        let test = TestCollab::new();
        test.connect("abc").await;

        test.collab
            .handle_message("abc", r#"{"type": "client_leave", "info": {"room_id": "gone"}}"#)
            .await
            .unwrap();

        assert_eq!(test.transport.take("abc")[0]["type"], "client_confused");
        assert!(test.notifier.take(NoticeKind::Error).is_empty());
    }

    #[tokio::test]
    async fn test_faults_are_returned_and_reported() {
        let test = TestCollab::new();

        // Never connected, so there is no record to find
        let result = test
            .collab
            .handle_message("ghost", r#"{"type": "client_leave", "info": {"room_id": "x"}}"#)
            .await;

        assert!(matches!(result, Err(CollabError::Database(_))));
        assert!(
            test.transport.take("ghost").is_empty(),
            "the transport layer is responsible for telling the client about faults"
        );

        let notices = test.notifier.take(NoticeKind::Error);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].subject, "couch API error");
    }

    #[tokio::test]
    async fn test_disconnect_tells_the_room() {
        let test = TestCollab::new();
        let (room_id, _) = test.create_room("admin").await;
        test.join("guest", &room_id).await;
        test.transport.clear();

        test.collab.disconnect("guest").await.unwrap();

        let messages = test.transport.take("admin");
        assert_eq!(messages[0]["type"], "room_clients");
        assert_eq!(messages[0]["info"]["clients"]["total"], 1);
        assert!(test.collab.database().client("guest").await.is_err());

        test.collab
            .disconnect("guest")
            .await
            .expect("closing an unknown connection should be harmless");
    }
}
