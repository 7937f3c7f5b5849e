//! Scheduler type definitions.
//!
//! This module contains the error type, reminder states and the snapshot type
//! returned when listing reminders.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU8, Ordering};
use thiserror::Error;

use crate::core::request::RequestProblem;
use crate::core::types::{ReminderId, TaskId};

/// Errors that can occur when arming a reminder.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The request is malformed.
    #[error("invalid reminder request: {0}")]
    InvalidRequest(#[from] RequestProblem),

    /// `arm` was called outside a Tokio runtime.
    #[error("no Tokio runtime available to run reminder timers")]
    RuntimeUnavailable,
}

/// State of a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReminderState {
    /// Waiting for its fire time.
    Armed = 0,
    /// Delivery was started. Terminal.
    Fired = 1,
    /// Cancelled, or never scheduled because the event had passed. Terminal.
    Cancelled = 2,
}

impl ReminderState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ReminderState::Armed,
            1 => ReminderState::Fired,
            _ => ReminderState::Cancelled,
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReminderState::Armed)
    }
}

impl std::fmt::Display for ReminderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderState::Armed => write!(f, "armed"),
            ReminderState::Fired => write!(f, "fired"),
            ReminderState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Shared reminder state, updated only by compare-and-swap.
///
/// Whichever of the timer and a canceller wins the swap out of `Armed` decides
/// the outcome; the loser observes a terminal state and does nothing.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: ReminderState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn get(&self) -> ReminderState {
        ReminderState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`. Returns false if the current state is not `from`.
    pub(crate) fn transition(&self, from: ReminderState, to: ReminderState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Read-only view of an armed reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderInfo {
    pub id: ReminderId,
    pub subject_id: TaskId,
    pub recipient: String,
    pub fire_at: DateTime<Utc>,
    pub state: ReminderState,
}
