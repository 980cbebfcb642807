//! The task source the dependency engine reads from.

use crate::types::Task;
use anyhow::{Result, anyhow};
use std::sync::{Arc, RwLock};

/// Read access to tasks. The engine never writes through it.
pub trait TaskRepository: Send + Sync {
    fn find_by_id(&self, task_id: &str) -> Result<Option<Task>>;

    fn find_all(&self) -> Result<Vec<Task>>;

    /// A view restricted to one user's tasks, when the store supports it.
    fn scoped_to_user(&self, _user_id: &str) -> Option<Arc<dyn TaskRepository>> {
        None
    }
}

/// Vec-backed repository, used by tests and by embedders without a database.
#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<Vec<Task>>,
}

impl InMemoryTaskRepository {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: RwLock::new(tasks),
        }
    }

    /// Insert a task, replacing any task with the same id.
    pub fn upsert(&self, task: Task) -> Result<()> {
        let mut tasks = self
            .tasks
            .write()
            .map_err(|_| anyhow!("task store lock poisoned"))?;
        match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => tasks.push(task),
        }
        Ok(())
    }
}

impl TaskRepository for InMemoryTaskRepository {
    fn find_by_id(&self, task_id: &str) -> Result<Option<Task>> {
        let tasks = self
            .tasks
            .read()
            .map_err(|_| anyhow!("task store lock poisoned"))?;
        Ok(tasks.iter().find(|t| t.id == task_id).cloned())
    }

    fn find_all(&self) -> Result<Vec<Task>> {
        let tasks = self
            .tasks
            .read()
            .map_err(|_| anyhow!("task store lock poisoned"))?;
        Ok(tasks.clone())
    }

    fn scoped_to_user(&self, user_id: &str) -> Option<Arc<dyn TaskRepository>> {
        let tasks = self.find_all().ok()?;
        let owned = tasks
            .into_iter()
            .filter(|t| t.user_id.as_deref() == Some(user_id))
            .collect();
        Some(Arc::new(InMemoryTaskRepository::new(owned)))
    }
}
