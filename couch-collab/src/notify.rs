use async_trait::async_trait;
use log::{error, info};
use serde::Serialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Could not reach webhook: {0}")]
    Request(#[from] reqwest::Error),
}

/// Which channel a notice goes out on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Server faults and client errors, for whoever maintains the server
    Error,
    /// Feedback sent in by users
    Feedback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub subject: String,
    pub body: String,
}

/// Relays notices to the people running the server
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, kind: NoticeKind, notice: Notice) -> Result<(), NotifyError>;
}

/// Writes notices to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, kind: NoticeKind, notice: Notice) -> Result<(), NotifyError> {
        match kind {
            NoticeKind::Error => error!("{}\n{}", notice.subject, notice.body),
            NoticeKind::Feedback => info!("{}\n{}", notice.subject, notice.body),
        }

        Ok(())
    }
}

/// Posts notices as JSON to a webhook per channel.
/// Channels without a webhook fall back to the log.
pub struct WebhookNotifier {
    client: reqwest::Client,
    errors: Option<Url>,
    feedback: Option<Url>,
}

impl WebhookNotifier {
    pub fn new(errors: Option<Url>, feedback: Option<Url>) -> Self {
        Self {
            client: reqwest::Client::new(),
            errors,
            feedback,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, kind: NoticeKind, notice: Notice) -> Result<(), NotifyError> {
        let url = match kind {
            NoticeKind::Error => &self.errors,
            NoticeKind::Feedback => &self.feedback,
        };

        let Some(url) = url else {
            return LogNotifier.notify(kind, notice).await;
        };

        self.client
            .post(url.clone())
            .json(&notice)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
