//! Reminder requests.
//!
//! A [`ReminderRequest`] is the immutable description of one reminder: what it
//! is about, who receives it, when the underlying event happens and how long
//! before that event the reminder should go out.

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use super::types::TaskId;

/// Lead time applied to task reminders unless configured otherwise.
pub const DEFAULT_LEAD_TIME: TimeDelta = TimeDelta::minutes(5);

/// Why a reminder request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestProblem {
    /// The message is empty or whitespace.
    #[error("message must not be empty")]
    EmptyMessage,

    /// The recipient is empty or whitespace.
    #[error("recipient must not be empty")]
    EmptyRecipient,

    /// The lead time is negative.
    #[error("lead time must not be negative")]
    NegativeLeadTime,
}

/// Request to deliver a message some time before an event.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRequest {
    subject_id: TaskId,
    recipient: String,
    event_time: DateTime<Utc>,
    lead_time: TimeDelta,
    message: String,
}

impl ReminderRequest {
    /// Create a request with the default five minute lead time.
    pub fn new(
        subject_id: impl Into<TaskId>,
        recipient: impl Into<String>,
        event_time: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            recipient: recipient.into(),
            event_time,
            lead_time: DEFAULT_LEAD_TIME,
            message: message.into(),
        }
    }

    /// Builder: set the lead time.
    pub fn with_lead_time(mut self, lead_time: TimeDelta) -> Self {
        self.lead_time = lead_time;
        self
    }

    pub fn subject_id(&self) -> &TaskId {
        &self.subject_id
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn event_time(&self) -> DateTime<Utc> {
        self.event_time
    }

    pub fn lead_time(&self) -> TimeDelta {
        self.lead_time
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The instant the reminder is due: `event_time - lead_time`.
    ///
    /// Saturates at the earliest representable time rather than overflowing.
    pub fn fire_at(&self) -> DateTime<Utc> {
        self.event_time
            .checked_sub_signed(self.lead_time)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Check the request is well-formed.
    pub fn validate(&self) -> Result<(), RequestProblem> {
        if self.message.trim().is_empty() {
            return Err(RequestProblem::EmptyMessage);
        }
        if self.recipient.trim().is_empty() {
            return Err(RequestProblem::EmptyRecipient);
        }
        if self.lead_time < TimeDelta::zero() {
            return Err(RequestProblem::NegativeLeadTime);
        }
        Ok(())
    }
}
