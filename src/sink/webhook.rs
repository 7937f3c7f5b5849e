use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{DeliveryError, NotificationSink};

/// Header carrying the shared webhook key, when one is configured.
pub const WEBHOOK_KEY_HEADER: &str = "nudge-webhook-key";

/// Default request timeout for webhook calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON body posted to the webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub recipient: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

/// Sink that POSTs each notification as JSON to an HTTP endpoint.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    key: Option<String>,
    timeout: Duration,
}

impl WebhookSink {
    /// Create a sink posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Builder: send this key in the webhook key header.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Builder: set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), DeliveryError> {
        let payload = WebhookPayload {
            recipient: recipient.to_string(),
            message: message.to_string(),
            sent_at: Utc::now(),
        };

        let mut request = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&payload);
        if let Some(key) = &self.key {
            request = request.header(WEBHOOK_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(url = %self.url, status = %status, "Webhook accepted notification");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
