//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Why a `nudge.yaml` file was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Malformed(#[from] serde_yaml::Error),

    /// Not a chrono-tz name.
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("lead_time_secs {0} is out of range")]
    LeadTimeOutOfRange(u64),

    /// A required value is empty.
    #[error("{0} must not be empty")]
    Blank(String),

    #[error("webhook timeout_secs cannot be zero")]
    ZeroWebhookTimeout,

    /// A seed task sets both `due_at` and `due_in_mins`.
    #[error("task '{0}' sets both due_at and due_in_mins")]
    ConflictingDueTimes(String),

    #[error("task '{title}' has an out of range due_in_mins: {mins}")]
    DueOffsetOutOfRange { title: String, mins: i64 },
}
