//! Outbound replies to message senders
//!
//! Replies are side effects of an already-stored expense. They are spawned
//! onto the runtime and their failures only logged; a failed reply never
//! touches the stored record.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Environment variable naming the reply webhook
pub const REPLY_WEBHOOK_ENV: &str = "TALLY_REPLY_WEBHOOK_URL";

/// Upper bound on one reply delivery, connect through response
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers a text message to a sender
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, to: &str, message: &str) -> Result<()>;
}

/// POSTs `{"to", "message"}` JSON to a relay endpoint
#[derive(Clone)]
pub struct WebhookNotifier {
    http_client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self> {
        Self::with_timeout(url, REPLY_TIMEOUT)
    }

    /// Create a notifier whose requests give up after `timeout`
    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            url: url.to_string(),
        })
    }

    /// Create from `TALLY_REPLY_WEBHOOK_URL`; `Ok(None)` when it is unset
    pub fn from_env() -> Result<Option<Self>> {
        std::env::var(REPLY_WEBHOOK_ENV)
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(|u| Self::new(u.trim()))
            .transpose()
    }
}

#[derive(Serialize)]
struct ReplyPayload<'a> {
    to: &'a str,
    message: &'a str,
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, to: &str, message: &str) -> Result<()> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&ReplyPayload { to, message })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Backend(format!(
                "Reply webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Writes replies to the log instead of sending them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, to: &str, message: &str) -> Result<()> {
        info!(to, "Reply: {}", message);
        Ok(())
    }
}

/// Webhook notifier when configured, otherwise the log notifier
pub fn notifier_from_env() -> Arc<dyn Notifier> {
    match WebhookNotifier::from_env() {
        Ok(Some(webhook)) => Arc::new(webhook),
        Ok(None) => Arc::new(LogNotifier),
        Err(e) => {
            warn!("Reply webhook unavailable, logging replies instead: {}", e);
            Arc::new(LogNotifier)
        }
    }
}

/// Send a reply in the background, logging any failure
pub fn dispatch(
    notifier: Arc<dyn Notifier>,
    to: String,
    message: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&to, &message).await {
            warn!(to = %to, "Failed to send reply: {}", e);
        }
    })
}
