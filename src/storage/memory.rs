//! In-memory storage implementation.
//!
//! Provides a thread-safe in-memory backend for tests, demos and the CLI.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{StorageError, TaskStore};
use crate::core::task::Task;
use crate::core::types::{TaskId, UserId};

/// In-memory task store.
///
/// Thread-safe storage using RwLock for concurrent access.
/// Data is not persisted across restarts.
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl InMemoryTaskStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored tasks across all owners.
    pub fn len(&self) -> usize {
        self.tasks.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save_task(&self, task: Task) -> Result<(), StorageError> {
        let mut tasks = self.tasks.write().map_err(|_| StorageError::LockPoisoned)?;
        if tasks.contains_key(&task.id) {
            return Err(StorageError::DuplicateKey(format!("task: {}", task.id)));
        }
        tasks.insert(task.id.clone(), task);
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, StorageError> {
        let tasks = self.tasks.read().map_err(|_| StorageError::LockPoisoned)?;
        tasks
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("task: {}", id)))
    }

    async fn list_tasks(&self, owner: &UserId) -> Result<Vec<Task>, StorageError> {
        let tasks = self.tasks.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut result: Vec<_> = tasks
            .values()
            .filter(|t| &t.owner == owner)
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            (a.due_at.is_none(), a.due_at, a.created_at).cmp(&(
                b.due_at.is_none(),
                b.due_at,
                b.created_at,
            ))
        });
        Ok(result)
    }

    async fn update_task(&self, task: Task) -> Result<(), StorageError> {
        let mut tasks = self.tasks.write().map_err(|_| StorageError::LockPoisoned)?;
        if !tasks.contains_key(&task.id) {
            return Err(StorageError::NotFound(format!("task: {}", task.id)));
        }
        tasks.insert(task.id.clone(), task);
        Ok(())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), StorageError> {
        let mut tasks = self.tasks.write().map_err(|_| StorageError::LockPoisoned)?;
        tasks
            .remove(id)
            .ok_or_else(|| StorageError::NotFound(format!("task: {}", id)))?;
        Ok(())
    }
}
