//! Deferred reminder scheduler.
//!
//! This module decides whether and when a reminder fires, arms one timer per
//! future reminder and guarantees the notification sink is called at most once
//! per armed request.

mod engine;
mod handle;
mod types;

pub use engine::ReminderScheduler;
pub use handle::ReminderHandle;
pub use types::{ReminderInfo, ReminderState, SchedulerError};
