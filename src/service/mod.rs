//! Task service.
//!
//! Ties task records to their reminders: creating a task with a due time arms
//! a reminder, editing the due time, title or completion re-arms it, and
//! deleting or completing the task cancels it.

mod message;

pub use message::{creation_message, describe_lead_time, reminder_message};

use chrono::TimeDelta;
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::core::request::{DEFAULT_LEAD_TIME, ReminderRequest};
use crate::core::task::{NewTask, Task, TaskUpdate, User};
use crate::core::types::TaskId;
use crate::scheduler::{ReminderHandle, ReminderScheduler, ReminderState, SchedulerError};
use crate::storage::{StorageError, TaskStore};

/// Errors returned by task operations.
#[derive(Debug, Error)]
pub enum TaskServiceError {
    /// The task input is not acceptable.
    #[error("invalid task: {0}")]
    InvalidTask(String),

    /// No task with this id exists.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The task belongs to someone else.
    #[error("not authorized to access task: {0}")]
    NotAuthorized(TaskId),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A reminder could not be armed.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Task operations with reminder bookkeeping.
pub struct TaskService<S: TaskStore> {
    store: Arc<S>,
    scheduler: ReminderScheduler,
    lead_time: TimeDelta,
    timezone: Tz,
    notify_on_create: bool,
    /// Latest reminder handle per task.
    reminders: Mutex<HashMap<TaskId, ReminderHandle>>,
}

impl<S: TaskStore> TaskService<S> {
    /// Create a service over `store` that arms reminders on `scheduler`.
    pub fn new(store: Arc<S>, scheduler: ReminderScheduler) -> Self {
        Self {
            store,
            scheduler,
            lead_time: DEFAULT_LEAD_TIME,
            timezone: chrono_tz::UTC,
            notify_on_create: true,
            reminders: Mutex::new(HashMap::new()),
        }
    }

    /// Set how long before the due time reminders fire.
    pub fn with_lead_time(mut self, lead_time: TimeDelta) -> Self {
        self.lead_time = lead_time;
        self
    }

    /// Set the timezone used to render due dates.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Enable or disable the notice sent when a task is created.
    pub fn with_notify_on_create(mut self, notify: bool) -> Self {
        self.notify_on_create = notify;
        self
    }

    /// Get the scheduler.
    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    /// Get the store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create a task for `user`.
    pub async fn create(&self, user: &User, new: NewTask) -> Result<Task, TaskServiceError> {
        if new.title.trim().is_empty() {
            return Err(TaskServiceError::InvalidTask("title must not be empty".into()));
        }
        if user.email.trim().is_empty() {
            return Err(TaskServiceError::InvalidTask(
                "user has no email address to notify".into(),
            ));
        }

        let now = self.scheduler.clock().now();
        let task = Task::from_new(TaskId::generate(), user.id.clone(), new, now);
        let request = self.reminder_request(user, &task);
        if let Some(request) = &request {
            self.scheduler.check(request)?;
        }

        self.store.save_task(task.clone()).await?;
        tracing::info!(task_id = %task.id, owner = %task.owner, due_at = ?task.due_at, "Task created");

        if let Err(e) = self.replace_reminder(&task.id, request) {
            if let Err(rollback) = self.store.delete_task(&task.id).await {
                tracing::error!(task_id = %task.id, error = %rollback, "Failed to roll back task");
            }
            return Err(e.into());
        }

        if self.notify_on_create {
            self.send_creation_notice(user, &task);
        }

        Ok(task)
    }

    /// Apply `update` to one of `user`'s tasks.
    pub async fn update(
        &self,
        user: &User,
        id: &TaskId,
        update: TaskUpdate,
    ) -> Result<Task, TaskServiceError> {
        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(TaskServiceError::InvalidTask("title must not be empty".into()));
            }
        }

        let mut task = self.owned_task(user, id).await?;
        let changes = task.apply(update, self.scheduler.clock().now());
        if !changes.any() {
            return Ok(task);
        }

        let rearm = changes.affects_reminder();
        let request = if rearm {
            self.reminder_request(user, &task)
        } else {
            None
        };
        if let Some(request) = &request {
            self.scheduler.check(request)?;
        }

        self.store.update_task(task.clone()).await?;
        tracing::info!(task_id = %task.id, "Task updated");

        if rearm {
            self.replace_reminder(&task.id, request)?;
        }

        Ok(task)
    }

    /// Mark one of `user`'s tasks as completed.
    pub async fn complete(&self, user: &User, id: &TaskId) -> Result<Task, TaskServiceError> {
        self.update(user, id, TaskUpdate::new().completed(true)).await
    }

    /// Delete one of `user`'s tasks and cancel its reminder.
    pub async fn delete(&self, user: &User, id: &TaskId) -> Result<(), TaskServiceError> {
        self.owned_task(user, id).await?;
        self.store.delete_task(id).await?;
        if let Some(handle) = self.lock_reminders().remove(id) {
            handle.cancel();
        }

        tracing::info!(task_id = %id, "Task deleted");
        Ok(())
    }

    /// Get one of `user`'s tasks.
    pub async fn get(&self, user: &User, id: &TaskId) -> Result<Task, TaskServiceError> {
        self.owned_task(user, id).await
    }

    /// List `user`'s tasks, earliest due first.
    pub async fn list(&self, user: &User) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self.store.list_tasks(&user.id).await?)
    }

    /// State of the latest reminder armed for a task, if any was armed.
    pub fn reminder_state(&self, id: &TaskId) -> Option<ReminderState> {
        self.lock_reminders().get(id).map(|handle| handle.state())
    }

    /// Cancel every armed reminder. Returns how many were cancelled.
    pub fn shutdown(&self) -> usize {
        self.lock_reminders().clear();
        self.scheduler.shutdown()
    }

    async fn owned_task(&self, user: &User, id: &TaskId) -> Result<Task, TaskServiceError> {
        let task = match self.store.get_task(id).await {
            Ok(task) => task,
            Err(StorageError::NotFound(_)) => return Err(TaskServiceError::NotFound(id.clone())),
            Err(e) => return Err(e.into()),
        };

        if task.owner != user.id {
            tracing::warn!(task_id = %id, user_id = %user.id, "Task access denied");
            return Err(TaskServiceError::NotAuthorized(id.clone()));
        }
        Ok(task)
    }

    /// Reminder request for `task`, if it should be reminded at all.
    fn reminder_request(&self, user: &User, task: &Task) -> Option<ReminderRequest> {
        let due_at = task.due_at?;
        if !task.wants_reminder() {
            return None;
        }

        let request = ReminderRequest::new(
            task.id.clone(),
            user.email.clone(),
            due_at,
            reminder_message(&task.title, self.lead_time),
        )
        .with_lead_time(self.lead_time);
        Some(request)
    }

    /// Cancel the task's current reminder and arm `request` in its place.
    ///
    /// The map stays locked throughout so concurrent edits of one task cannot
    /// leave an armed reminder without a handle.
    fn replace_reminder(
        &self,
        id: &TaskId,
        request: Option<ReminderRequest>,
    ) -> Result<(), SchedulerError> {
        let mut reminders = self.lock_reminders();
        if let Some(previous) = reminders.get(id) {
            previous.cancel();
        }

        if let Some(request) = request {
            let handle = self.scheduler.arm(request)?;
            tracing::debug!(task_id = %id, reminder_id = %handle.id(), state = %handle.state(), "Reminder requested");
            reminders.insert(id.clone(), handle);
        }
        Ok(())
    }

    /// Send the creation notice without making the caller wait for it.
    fn send_creation_notice(&self, user: &User, task: &Task) {
        let sink = Arc::clone(self.scheduler.sink());
        let recipient = user.email.clone();
        let message = creation_message(&task.title, task.due_at, self.timezone);
        let task_id = task.id.clone();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(task_id = %task_id, "No runtime available, creation notice not sent");
            return;
        };
        runtime.spawn(async move {
            match sink.deliver(&recipient, &message).await {
                Ok(()) => tracing::debug!(task_id = %task_id, "Creation notice sent"),
                Err(e) => {
                    tracing::warn!(task_id = %task_id, error = %e, "Creation notice failed")
                }
            }
        });
    }

    fn lock_reminders(&self) -> MutexGuard<'_, HashMap<TaskId, ReminderHandle>> {
        self.reminders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
