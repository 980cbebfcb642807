//! `TaskRepository` over the SQLite store, plain and user-scoped.

use super::Database;
use super::tasks::{get_task_internal, list_tasks_internal};
use crate::deps::TaskRepository;
use crate::types::{Task, TaskFilter};
use anyhow::Result;
use std::sync::Arc;

impl TaskRepository for Database {
    fn find_by_id(&self, task_id: &str) -> Result<Option<Task>> {
        self.get_task(task_id)
    }

    fn find_all(&self) -> Result<Vec<Task>> {
        self.list_tasks(&TaskFilter::default())
    }

    fn scoped_to_user(&self, user_id: &str) -> Option<Arc<dyn TaskRepository>> {
        Some(Arc::new(UserScopedTasks::new(self.clone(), user_id)))
    }
}

/// Read-only view of the store restricted to one user's tasks.
#[derive(Clone)]
pub struct UserScopedTasks {
    db: Database,
    user_id: String,
}

impl UserScopedTasks {
    pub fn new(db: Database, user_id: impl Into<String>) -> Self {
        Self {
            db,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl TaskRepository for UserScopedTasks {
    fn find_by_id(&self, task_id: &str) -> Result<Option<Task>> {
        self.db.with_conn(|conn| {
            Ok(get_task_internal(conn, task_id)?
                .filter(|task| task.user_id.as_deref() == Some(self.user_id.as_str())))
        })
    }

    fn find_all(&self) -> Result<Vec<Task>> {
        self.db.with_conn(|conn| {
            list_tasks_internal(
                conn,
                &TaskFilter {
                    user_id: Some(self.user_id.clone()),
                    ..Default::default()
                },
            )
        })
    }

    fn scoped_to_user(&self, user_id: &str) -> Option<Arc<dyn TaskRepository>> {
        Some(Arc::new(UserScopedTasks::new(self.db.clone(), user_id)))
    }
}
