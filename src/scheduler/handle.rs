//! Reminder handle for cancelling an armed reminder.
//!
//! This module provides the `ReminderHandle` type returned by
//! [`ReminderScheduler::arm`](super::ReminderScheduler::arm).

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Weak};

use crate::core::types::{ReminderId, TaskId};
use crate::events::{Event, EventBus, emit_detached};

use super::engine::{Registry, lock_registry};
use super::types::{ReminderState, StateCell};

/// Handle to one armed reminder.
///
/// Clones share the same underlying reminder. Cancelling is idempotent and
/// never fails.
#[derive(Clone)]
pub struct ReminderHandle {
    pub(crate) id: ReminderId,
    pub(crate) subject_id: TaskId,
    pub(crate) fire_at: DateTime<Utc>,
    pub(crate) state: Arc<StateCell>,
    pub(crate) registry: Weak<Registry>,
    pub(crate) event_bus: Arc<EventBus>,
}

impl ReminderHandle {
    /// Get the reminder id.
    pub fn id(&self) -> &ReminderId {
        &self.id
    }

    /// Get the subject the reminder is about.
    pub fn subject_id(&self) -> &TaskId {
        &self.subject_id
    }

    /// Get the computed fire time.
    pub fn fire_at(&self) -> DateTime<Utc> {
        self.fire_at
    }

    /// Get the current state.
    pub fn state(&self) -> ReminderState {
        self.state.get()
    }

    /// Check if the reminder is still waiting to fire.
    pub fn is_armed(&self) -> bool {
        self.state() == ReminderState::Armed
    }

    /// Cancel the reminder.
    ///
    /// Returns true if this call moved the reminder from `Armed` to
    /// `Cancelled`. Calling it on a fired or already cancelled reminder does
    /// nothing.
    pub fn cancel(&self) -> bool {
        if !self
            .state
            .transition(ReminderState::Armed, ReminderState::Cancelled)
        {
            tracing::debug!(reminder_id = %self.id, state = %self.state(), "Cancel ignored, reminder not armed");
            return false;
        }

        if let Some(registry) = self.registry.upgrade() {
            if let Some(entry) = lock_registry(&registry).remove(&self.id) {
                entry.timer.abort();
            }
        }

        tracing::info!(reminder_id = %self.id, subject_id = %self.subject_id, "Reminder cancelled");
        emit_detached(
            &self.event_bus,
            Event::reminder_cancelled(self.id.clone(), self.subject_id.clone()),
        );
        true
    }
}

impl fmt::Debug for ReminderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReminderHandle")
            .field("id", &self.id)
            .field("subject_id", &self.subject_id)
            .field("fire_at", &self.fire_at)
            .field("state", &self.state())
            .finish()
    }
}
