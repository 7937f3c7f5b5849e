//! Reminder scheduler implementation.
//!
//! The scheduler is responsible for:
//! - Deciding whether and when a reminder fires
//! - Arming one Tokio timer per future reminder
//! - Invoking the notification sink at most once per armed reminder
//! - Cancellation and best-effort shutdown
//! - Event emission

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;

use crate::core::clock::{Clock, SystemClock};
use crate::core::plan::FirePlan;
use crate::core::request::ReminderRequest;
use crate::core::types::ReminderId;
use crate::events::{Event, EventBus, emit_detached};
use crate::sink::NotificationSink;

use super::handle::ReminderHandle;
use super::types::{ReminderInfo, ReminderState, SchedulerError, StateCell};

/// Armed reminders keyed by id. Owned by the scheduler; handles hold a weak reference.
pub(crate) type Registry = Mutex<HashMap<ReminderId, ScheduledReminder>>;

/// A live reminder waiting for its fire time.
pub(crate) struct ScheduledReminder {
    request: Arc<ReminderRequest>,
    fire_at: DateTime<Utc>,
    pub(crate) timer: JoinHandle<()>,
    state: Arc<StateCell>,
}

impl ScheduledReminder {
    fn info(&self, id: &ReminderId) -> ReminderInfo {
        ReminderInfo {
            id: id.clone(),
            subject_id: self.request.subject_id().clone(),
            recipient: self.request.recipient().to_string(),
            fire_at: self.fire_at,
            state: self.state.get(),
        }
    }
}

/// Lock the registry, recovering from poisoning so cancellation never fails.
pub(crate) fn lock_registry(registry: &Registry) -> MutexGuard<'_, HashMap<ReminderId, ScheduledReminder>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything a timer task needs once it is spawned.
struct ArmedTimer {
    id: ReminderId,
    request: Arc<ReminderRequest>,
    deadline: tokio::time::Instant,
    state: Arc<StateCell>,
    registry: Weak<Registry>,
    sink: Arc<dyn NotificationSink>,
    event_bus: Arc<EventBus>,
}

/// Deferred notification scheduler.
///
/// Cloning is cheap and clones share the same set of armed reminders.
#[derive(Clone)]
pub struct ReminderScheduler {
    /// Where fired reminders are delivered.
    sink: Arc<dyn NotificationSink>,
    /// Wall-clock source for fire-time decisions.
    clock: Arc<dyn Clock>,
    /// Event bus for lifecycle events.
    event_bus: Arc<EventBus>,
    /// Armed reminders.
    registry: Arc<Registry>,
}

impl ReminderScheduler {
    /// Create a scheduler delivering through `sink`, using the system clock.
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            clock: Arc::new(SystemClock),
            event_bus: Arc::new(EventBus::new()),
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Set the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the event bus.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Arc::new(event_bus);
        self
    }

    /// Get the event bus.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Get the clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Get the sink.
    pub fn sink(&self) -> &Arc<dyn NotificationSink> {
        &self.sink
    }

    /// Arm a reminder.
    ///
    /// Never blocks. Must be called from within a Tokio runtime.
    ///
    /// - Fire time in the future: a timer is armed and the handle is `Armed`.
    /// - Fire time reached but event still ahead: delivery starts right away
    ///   and the handle is `Fired`.
    /// - Event already passed: nothing is delivered and the handle is
    ///   `Cancelled`.
    pub fn arm(&self, request: ReminderRequest) -> Result<ReminderHandle, SchedulerError> {
        let runtime = self.admit(&request)?;

        let id = ReminderId::new();
        let now = self.clock.now();
        let request = Arc::new(request);

        match FirePlan::compute(request.event_time(), request.lead_time(), now) {
            FirePlan::Overdue => {
                tracing::info!(
                    reminder_id = %id,
                    subject_id = %request.subject_id(),
                    event_time = %request.event_time(),
                    "Event already passed, reminder not scheduled"
                );
                emit_detached(
                    &self.event_bus,
                    Event::reminder_skipped(
                        id.clone(),
                        request.subject_id().clone(),
                        request.event_time(),
                    ),
                );
                Ok(self.unregistered_handle(id, &request, ReminderState::Cancelled))
            }
            FirePlan::FireNow => {
                tracing::info!(
                    reminder_id = %id,
                    subject_id = %request.subject_id(),
                    event_time = %request.event_time(),
                    "Inside lead window, delivering reminder immediately"
                );
                let handle = self.unregistered_handle(id.clone(), &request, ReminderState::Fired);
                runtime.spawn(deliver(
                    Arc::clone(&self.sink),
                    Arc::clone(&self.event_bus),
                    id,
                    request,
                ));
                Ok(handle)
            }
            FirePlan::Schedule { fire_at, delay } => {
                let state = Arc::new(StateCell::new(ReminderState::Armed));
                let timer = ArmedTimer {
                    id: id.clone(),
                    request: Arc::clone(&request),
                    deadline: tokio::time::Instant::now() + delay,
                    state: Arc::clone(&state),
                    registry: Arc::downgrade(&self.registry),
                    sink: Arc::clone(&self.sink),
                    event_bus: Arc::clone(&self.event_bus),
                };

                // Queued before the timer task so handlers see it ahead of any
                // fired or cancelled event for this reminder.
                emit_detached(
                    &self.event_bus,
                    Event::reminder_armed(id.clone(), request.subject_id().clone(), fire_at),
                );

                // Insert under the lock so the timer can never run before its entry exists.
                let mut entries = lock_registry(&self.registry);
                let join = runtime.spawn(run_timer(timer));
                entries.insert(
                    id.clone(),
                    ScheduledReminder {
                        request: Arc::clone(&request),
                        fire_at,
                        timer: join,
                        state: Arc::clone(&state),
                    },
                );
                drop(entries);

                tracing::debug!(
                    reminder_id = %id,
                    subject_id = %request.subject_id(),
                    fire_at = %fire_at,
                    delay = ?delay,
                    "Reminder armed"
                );

                Ok(ReminderHandle {
                    id,
                    subject_id: request.subject_id().clone(),
                    fire_at,
                    state,
                    registry: Arc::downgrade(&self.registry),
                    event_bus: Arc::clone(&self.event_bus),
                })
            }
        }
    }

    /// Check that [`arm`](Self::arm) would accept `request`, without arming it.
    pub fn check(&self, request: &ReminderRequest) -> Result<(), SchedulerError> {
        self.admit(request).map(|_| ())
    }

    /// Cancel a reminder. Idempotent; see [`ReminderHandle::cancel`].
    pub fn cancel(&self, handle: &ReminderHandle) -> bool {
        handle.cancel()
    }

    /// Number of reminders still waiting to fire.
    pub fn active_count(&self) -> usize {
        lock_registry(&self.registry).len()
    }

    /// Snapshot of all armed reminders, earliest fire time first.
    pub fn reminders(&self) -> Vec<ReminderInfo> {
        let entries = lock_registry(&self.registry);
        let mut reminders: Vec<_> = entries.iter().map(|(id, entry)| entry.info(id)).collect();
        reminders.sort_by(|a, b| a.fire_at.cmp(&b.fire_at));
        reminders
    }

    /// Snapshot of one armed reminder.
    pub fn get(&self, id: &ReminderId) -> Option<ReminderInfo> {
        lock_registry(&self.registry)
            .get(id)
            .map(|entry| entry.info(id))
    }

    /// Cancel every armed reminder. Returns how many were cancelled.
    ///
    /// Reminders are held in memory only, so anything still armed at process
    /// exit is lost.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<_> = lock_registry(&self.registry).drain().collect();

        let mut cancelled = 0;
        for (id, entry) in drained {
            if entry
                .state
                .transition(ReminderState::Armed, ReminderState::Cancelled)
            {
                entry.timer.abort();
                emit_detached(
                    &self.event_bus,
                    Event::reminder_cancelled(id, entry.request.subject_id().clone()),
                );
                cancelled += 1;
            }
        }

        tracing::info!(cancelled, "Reminder scheduler shut down");
        cancelled
    }

    fn admit(&self, request: &ReminderRequest) -> Result<tokio::runtime::Handle, SchedulerError> {
        request.validate()?;
        tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::RuntimeUnavailable)
    }

    /// Handle for a reminder that never enters the registry.
    fn unregistered_handle(
        &self,
        id: ReminderId,
        request: &ReminderRequest,
        state: ReminderState,
    ) -> ReminderHandle {
        ReminderHandle {
            id,
            subject_id: request.subject_id().clone(),
            fire_at: request.fire_at(),
            state: Arc::new(StateCell::new(state)),
            registry: Weak::new(),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

/// Wait for the fire time, then deliver unless cancelled first.
async fn run_timer(timer: ArmedTimer) {
    tokio::time::sleep_until(timer.deadline).await;

    if !timer
        .state
        .transition(ReminderState::Armed, ReminderState::Fired)
    {
        return;
    }

    if let Some(registry) = timer.registry.upgrade() {
        lock_registry(&registry).remove(&timer.id);
    }

    deliver(timer.sink, timer.event_bus, timer.id, timer.request).await;
}

/// Invoke the sink once and report the outcome. Failures are not retried.
async fn deliver(
    sink: Arc<dyn NotificationSink>,
    event_bus: Arc<EventBus>,
    id: ReminderId,
    request: Arc<ReminderRequest>,
) {
    let subject_id = request.subject_id().clone();
    let recipient = request.recipient().to_string();

    tracing::info!(
        reminder_id = %id,
        subject_id = %subject_id,
        recipient = %recipient,
        sink = sink.name(),
        "Reminder fired"
    );
    event_bus
        .emit(Event::reminder_fired(
            id.clone(),
            subject_id.clone(),
            recipient.clone(),
        ))
        .await;

    let start = std::time::Instant::now();
    match sink.deliver(request.recipient(), request.message()).await {
        Ok(()) => {
            let duration = start.elapsed();
            tracing::info!(reminder_id = %id, subject_id = %subject_id, duration = ?duration, "Reminder delivered");
            event_bus
                .emit(Event::reminder_delivered(id, subject_id, recipient, duration))
                .await;
        }
        Err(e) => {
            tracing::warn!(reminder_id = %id, subject_id = %subject_id, error = %e, "Reminder delivery failed");
            event_bus
                .emit(Event::delivery_failed(id, subject_id, recipient, e.to_string()))
                .await;
        }
    }
}
