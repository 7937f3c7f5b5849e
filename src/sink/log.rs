use async_trait::async_trait;

use super::{DeliveryError, NotificationSink};

/// Sink that writes notifications to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), DeliveryError> {
        tracing::info!(recipient = %recipient, "Notification: {}", message);
        Ok(())
    }
}
