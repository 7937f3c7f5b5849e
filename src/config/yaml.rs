//! YAML configuration parsing.
//!
//! Parses the service configuration (nudge.yaml).

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::error::ConfigError;
use crate::core::request::DEFAULT_LEAD_TIME;
use crate::core::task::{NewTask, Priority, User};
use crate::sink::{LogSink, NotificationSink, WebhookSink};

/// Service configuration (nudge.yaml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgeConfig {
    /// Seconds before the due time that reminders fire.
    #[serde(default = "default_lead_time_secs")]
    pub lead_time_secs: u64,
    /// Whether to notify the user when a task is created.
    #[serde(default = "default_true")]
    pub notify_on_create: bool,
    /// Timezone used to render due dates in notifications.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Where notifications are delivered.
    #[serde(default)]
    pub sink: SinkConfig,
    /// The user the seed tasks belong to.
    pub user: UserConfig,
    /// Tasks created at startup.
    #[serde(default)]
    pub tasks: Vec<SeedTask>,
}

fn default_lead_time_secs() -> u64 {
    DEFAULT_LEAD_TIME.num_seconds().unsigned_abs()
}

fn default_true() -> bool {
    true
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl NudgeConfig {
    /// Lead time as a duration.
    pub fn lead_time(&self) -> TimeDelta {
        i64::try_from(self.lead_time_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(DEFAULT_LEAD_TIME)
    }

    /// Parsed timezone.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))
    }

    /// The configured user.
    pub fn user(&self) -> User {
        User::new(self.user.id.as_str(), self.user.email.as_str())
    }
}

/// Delivery sink configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SinkConfig {
    /// Write notifications to the log (default).
    #[serde(rename = "log")]
    #[default]
    Log,
    /// POST notifications to an HTTP endpoint.
    #[serde(rename = "webhook")]
    Webhook {
        /// Endpoint URL.
        url: String,
        /// Shared key sent with every request.
        key: Option<String>,
        /// Request timeout in seconds.
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl SinkConfig {
    /// Build the configured sink.
    pub fn build(&self) -> Arc<dyn NotificationSink> {
        match self {
            SinkConfig::Log => Arc::new(LogSink),
            SinkConfig::Webhook {
                url,
                key,
                timeout_secs,
            } => {
                let mut sink =
                    WebhookSink::new(url.as_str()).with_timeout(Duration::from_secs(*timeout_secs));
                if let Some(key) = key {
                    sink = sink.with_key(key.as_str());
                }
                Arc::new(sink)
            }
        }
    }
}

/// The user the seed tasks are created for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub id: String,
    pub email: String,
}

/// A task created at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    /// Due time relative to startup, in minutes. May be negative.
    pub due_in_mins: Option<i64>,
    /// Absolute due time.
    pub due_at: Option<DateTime<Utc>>,
}

impl SeedTask {
    /// Resolve the due time against `now`.
    pub fn due_time(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match (self.due_at, self.due_in_mins) {
            (Some(at), _) => Some(at),
            (None, Some(mins)) => TimeDelta::try_minutes(mins).and_then(|d| now.checked_add_signed(d)),
            (None, None) => None,
        }
    }

    /// Build the task input, resolving the due time against `now`.
    pub fn to_new_task(&self, now: DateTime<Utc>) -> NewTask {
        let mut task = NewTask::new(self.title.as_str())
            .description(self.description.as_str())
            .priority(self.priority);
        if let Some(due) = self.due_time(now) {
            task = task.due_at(due);
        }
        task
    }
}

/// YAML configuration loader.
pub struct YamlLoader;

impl YamlLoader {
    /// Load configuration from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<NudgeConfig, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<NudgeConfig, ConfigError> {
        let config: NudgeConfig = serde_yaml::from_str(yaml)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration.
    fn validate(config: &NudgeConfig) -> Result<(), ConfigError> {
        if i64::try_from(config.lead_time_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .is_none()
        {
            return Err(ConfigError::LeadTimeOutOfRange(config.lead_time_secs));
        }

        config.timezone()?;

        if let SinkConfig::Webhook {
            url, timeout_secs, ..
        } = &config.sink
        {
            if url.trim().is_empty() {
                return Err(ConfigError::Blank("sink.url".into()));
            }
            if *timeout_secs == 0 {
                return Err(ConfigError::ZeroWebhookTimeout);
            }
        }

        if config.user.id.trim().is_empty() {
            return Err(ConfigError::Blank("user.id".into()));
        }
        if config.user.email.trim().is_empty() {
            return Err(ConfigError::Blank("user.email".into()));
        }

        for (index, task) in config.tasks.iter().enumerate() {
            if task.title.trim().is_empty() {
                return Err(ConfigError::Blank(format!("tasks[{}].title", index)));
            }
            if task.due_at.is_some() && task.due_in_mins.is_some() {
                return Err(ConfigError::ConflictingDueTimes(task.title.clone()));
            }
            if let Some(mins) = task.due_in_mins {
                if TimeDelta::try_minutes(mins).is_none() {
                    return Err(ConfigError::DueOffsetOutOfRange {
                        title: task.title.clone(),
                        mins,
                    });
                }
            }
        }

        Ok(())
    }
}
