//! Notification sink: tells an external chat about each new listing.
//!
//! Notifications are best-effort and at-most-once. `dispatch` runs each one
//! on its own task under a timeout, and every failure ends in a log line.
//! Nothing here can fail a listing creation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use types::listing::Listing;

use crate::config::TelegramConfig;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification sink is not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sink rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

/// Human-readable notification for a new listing.
pub fn listing_message(listing: &Listing) -> String {
    format!("New listing: {}\nPrice: {}", listing.title, listing.price)
}

/// Fire-and-forget delivery, bounded by `timeout`.
pub fn dispatch(notifier: Arc<dyn Notifier>, text: String, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, notifier.notify(&text)).await {
            Ok(Ok(())) => tracing::info!("Notification delivered"),
            Ok(Err(NotifyError::NotConfigured)) => {
                tracing::warn!("Notification sink not configured; message dropped")
            }
            Ok(Err(e)) => tracing::error!(error = %e, "Notification failed"),
            Err(_) => tracing::error!(timeout_ms = timeout.as_millis() as u64, "Notification timed out"),
        }
    })
}

/// Build the sink described by `config`, or a disabled one when the
/// credentials are missing.
pub fn from_config(config: &TelegramConfig, timeout: Duration) -> Result<Arc<dyn Notifier>, NotifyError> {
    let Some((token, chat_id)) = config.credentials() else {
        tracing::warn!("Telegram bot token or chat id not set; notifications disabled");
        return Ok(Arc::new(DisabledNotifier));
    };
    Ok(Arc::new(TelegramNotifier::new(
        &config.api_url,
        token.to_string(),
        chat_id.to_string(),
        timeout,
    )?))
}

/// Stand-in used when no credentials are configured.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, _text: &str) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured)
    }
}

/// Telegram Bot API `sendMessage`.
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(api_url: &str, token: String, chat_id: String, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", api_url.trim_end_matches('/'), token),
            chat_id,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let res = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
