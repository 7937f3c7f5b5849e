//! Reminder lifecycle events and event handling.
//!
//! The scheduler reports every transition of a reminder through an
//! [`EventBus`], which is how delivery failures reach logs and metrics without
//! being propagated to the caller that armed the reminder.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::types::{ReminderId, TaskId};

/// Lifecycle events emitted by the reminder scheduler.
#[derive(Debug, Clone)]
pub enum Event {
    /// A reminder has a timer waiting for its fire time.
    ReminderArmed {
        reminder_id: ReminderId,
        subject_id: TaskId,
        fire_at: DateTime<Utc>,
        timestamp: Instant,
    },

    /// The event was already in the past, so nothing was scheduled.
    ReminderSkipped {
        reminder_id: ReminderId,
        subject_id: TaskId,
        event_time: DateTime<Utc>,
        timestamp: Instant,
    },

    /// The reminder fired and delivery was started.
    ReminderFired {
        reminder_id: ReminderId,
        subject_id: TaskId,
        recipient: String,
        timestamp: Instant,
    },

    /// The sink accepted the reminder.
    ReminderDelivered {
        reminder_id: ReminderId,
        subject_id: TaskId,
        recipient: String,
        duration: Duration,
        timestamp: Instant,
    },

    /// The sink failed. Delivery is not retried.
    DeliveryFailed {
        reminder_id: ReminderId,
        subject_id: TaskId,
        recipient: String,
        error: String,
        timestamp: Instant,
    },

    /// The reminder was cancelled before it fired.
    ReminderCancelled {
        reminder_id: ReminderId,
        subject_id: TaskId,
        timestamp: Instant,
    },
}

impl Event {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> Instant {
        match self {
            Event::ReminderArmed { timestamp, .. } => *timestamp,
            Event::ReminderSkipped { timestamp, .. } => *timestamp,
            Event::ReminderFired { timestamp, .. } => *timestamp,
            Event::ReminderDelivered { timestamp, .. } => *timestamp,
            Event::DeliveryFailed { timestamp, .. } => *timestamp,
            Event::ReminderCancelled { timestamp, .. } => *timestamp,
        }
    }

    /// Get the reminder the event is about.
    pub fn reminder_id(&self) -> &ReminderId {
        match self {
            Event::ReminderArmed { reminder_id, .. }
            | Event::ReminderSkipped { reminder_id, .. }
            | Event::ReminderFired { reminder_id, .. }
            | Event::ReminderDelivered { reminder_id, .. }
            | Event::DeliveryFailed { reminder_id, .. }
            | Event::ReminderCancelled { reminder_id, .. } => reminder_id,
        }
    }

    /// Get the subject (task) of the reminder.
    pub fn subject_id(&self) -> &TaskId {
        match self {
            Event::ReminderArmed { subject_id, .. }
            | Event::ReminderSkipped { subject_id, .. }
            | Event::ReminderFired { subject_id, .. }
            | Event::ReminderDelivered { subject_id, .. }
            | Event::DeliveryFailed { subject_id, .. }
            | Event::ReminderCancelled { subject_id, .. } => subject_id,
        }
    }

    /// Create a ReminderArmed event.
    pub fn reminder_armed(
        reminder_id: ReminderId,
        subject_id: TaskId,
        fire_at: DateTime<Utc>,
    ) -> Self {
        Event::ReminderArmed {
            reminder_id,
            subject_id,
            fire_at,
            timestamp: Instant::now(),
        }
    }

    /// Create a ReminderSkipped event.
    pub fn reminder_skipped(
        reminder_id: ReminderId,
        subject_id: TaskId,
        event_time: DateTime<Utc>,
    ) -> Self {
        Event::ReminderSkipped {
            reminder_id,
            subject_id,
            event_time,
            timestamp: Instant::now(),
        }
    }

    /// Create a ReminderFired event.
    pub fn reminder_fired(reminder_id: ReminderId, subject_id: TaskId, recipient: String) -> Self {
        Event::ReminderFired {
            reminder_id,
            subject_id,
            recipient,
            timestamp: Instant::now(),
        }
    }

    /// Create a ReminderDelivered event.
    pub fn reminder_delivered(
        reminder_id: ReminderId,
        subject_id: TaskId,
        recipient: String,
        duration: Duration,
    ) -> Self {
        Event::ReminderDelivered {
            reminder_id,
            subject_id,
            recipient,
            duration,
            timestamp: Instant::now(),
        }
    }

    /// Create a DeliveryFailed event.
    pub fn delivery_failed(
        reminder_id: ReminderId,
        subject_id: TaskId,
        recipient: String,
        error: String,
    ) -> Self {
        Event::DeliveryFailed {
            reminder_id,
            subject_id,
            recipient,
            error,
            timestamp: Instant::now(),
        }
    }

    /// Create a ReminderCancelled event.
    pub fn reminder_cancelled(reminder_id: ReminderId, subject_id: TaskId) -> Self {
        Event::ReminderCancelled {
            reminder_id,
            subject_id,
            timestamp: Instant::now(),
        }
    }
}

/// Handler for receiving lifecycle events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: &Event);
}

/// Event bus for distributing events to registered handlers.
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    /// Create a new event bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register an event handler.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);
    }

    /// Emit an event to all registered handlers.
    pub async fn emit(&self, event: Event) {
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            handler.handle(&event).await;
        }
    }

    /// Get the number of registered handlers.
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Emit `event` from synchronous code by handing it to the current runtime.
///
/// Outside a Tokio runtime the event is dropped.
pub(crate) fn emit_detached(bus: &Arc<EventBus>, event: Event) {
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            let bus = Arc::clone(bus);
            runtime.spawn(async move {
                bus.emit(event).await;
            });
        }
        Err(_) => {
            tracing::debug!(reminder_id = %event.reminder_id(), "No runtime available, dropping event");
        }
    }
}
