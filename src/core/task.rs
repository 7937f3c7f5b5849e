//! Task records and the inputs used to create and edit them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::{TaskId, UserId};

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

/// The authenticated user acting on tasks.
///
/// The email address is where notifications for the user's tasks go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
}

impl User {
    pub fn new(id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}

/// A stored task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Owner of the task.
    pub owner: UserId,
    /// Short title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// When the task is due, if ever.
    pub due_at: Option<DateTime<Utc>>,
    /// Priority.
    pub priority: Priority,
    /// Whether the task has been completed.
    pub completed: bool,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Fields that changed when an update was applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: bool,
    pub description: bool,
    pub due_at: bool,
    pub priority: bool,
    pub completed: bool,
}

impl TaskChanges {
    /// True when the change affects the due-soon reminder.
    pub fn affects_reminder(&self) -> bool {
        self.title || self.due_at || self.completed
    }

    pub fn any(&self) -> bool {
        self.title || self.description || self.due_at || self.priority || self.completed
    }
}

impl Task {
    /// Build a task from creation input.
    pub fn from_new(id: TaskId, owner: UserId, new: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            title: new.title,
            description: new.description,
            due_at: new.due_at,
            priority: new.priority,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a due-soon reminder applies to this task.
    pub fn wants_reminder(&self) -> bool {
        self.due_at.is_some() && !self.completed
    }

    /// Apply a patch. Only the fields present in `update` are overwritten.
    pub fn apply(&mut self, update: TaskUpdate, now: DateTime<Utc>) -> TaskChanges {
        let mut changes = TaskChanges::default();

        if let Some(title) = update.title {
            if title != self.title {
                self.title = title;
                changes.title = true;
            }
        }
        if let Some(description) = update.description {
            if description != self.description {
                self.description = description;
                changes.description = true;
            }
        }
        if let Some(due_at) = update.due_at {
            if self.due_at != Some(due_at) {
                self.due_at = Some(due_at);
                changes.due_at = true;
            }
        }
        if let Some(priority) = update.priority {
            if priority != self.priority {
                self.priority = priority;
                changes.priority = true;
            }
        }
        if let Some(completed) = update.completed {
            if completed != self.completed {
                self.completed = completed;
                changes.completed = true;
            }
        }

        if changes.any() {
            self.updated_at = now;
        }
        changes
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Builder: set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set the due time.
    pub fn due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    /// Builder: set the priority.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Partial update of a task. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }
}
