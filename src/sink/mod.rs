//! Notification sinks.
//!
//! A sink is the outbound capability that actually delivers a message to a
//! recipient. The scheduler calls it from whatever Tokio worker runs the timer,
//! so implementations must be `Send + Sync` and report failure as a value.

mod log;
mod webhook;

pub use log::LogSink;
pub use webhook::{WebhookPayload, WebhookSink};

use async_trait::async_trait;
use thiserror::Error;

/// Errors a sink can report for a single delivery.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The message could not be handed to the transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote end refused the message.
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Any other failure.
    #[error("delivery failed: {0}")]
    Other(String),
}

/// Capability that delivers a message to a recipient.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Deliver `message` to `recipient`.
    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), DeliveryError>;
}
