//! Storage abstraction for task records.
//!
//! This module provides a trait-based storage abstraction so the task service
//! can run against any backend. Only an in-memory backend ships with the crate.

mod memory;

pub use memory::InMemoryTaskStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::task::Task;
use crate::core::types::{TaskId, UserId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested item was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A duplicate key was detected.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Storage lock was poisoned.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// Generic storage error.
    #[error("storage error: {0}")]
    Other(String),
}

/// Storage trait for task records.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Save a new task.
    async fn save_task(&self, task: Task) -> Result<(), StorageError>;

    /// Get a task by ID.
    async fn get_task(&self, id: &TaskId) -> Result<Task, StorageError>;

    /// List the tasks of one owner, earliest due time first.
    /// Tasks without a due time come last.
    async fn list_tasks(&self, owner: &UserId) -> Result<Vec<Task>, StorageError>;

    /// Replace an existing task.
    async fn update_task(&self, task: Task) -> Result<(), StorageError>;

    /// Delete a task by ID.
    async fn delete_task(&self, id: &TaskId) -> Result<(), StorageError>;
}
