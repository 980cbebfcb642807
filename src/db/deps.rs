//! Dependency edge operations and cycle detection.

use super::tasks::{dependency_ids_internal, get_task_internal};
use super::{Database, now_ms};
use crate::error::ToolError;
use anyhow::Result;
use rusqlite::{Connection, params};
use std::collections::{HashSet, VecDeque};

/// Check if making `task_id` depend on `depends_on_id` would create a cycle.
///
/// A cycle exists if `depends_on_id` already (transitively) depends on `task_id`.
fn would_create_cycle(conn: &Connection, task_id: &str, depends_on_id: &str) -> Result<bool> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(depends_on_id.to_string());

    while let Some(current) = queue.pop_front() {
        if current == task_id {
            return Ok(true);
        }
        if !visited.insert(current.clone()) {
            continue;
        }

        for dep in dependency_ids_internal(conn, &current)? {
            if !visited.contains(&dep) {
                queue.push_back(dep);
            }
        }
    }

    Ok(false)
}

impl Database {
    /// Record that `task_id` cannot start before `depends_on_id` is done.
    pub fn add_dependency(&self, task_id: &str, depends_on_id: &str) -> Result<()> {
        if task_id == depends_on_id {
            return Err(ToolError::dependency_cycle(task_id, depends_on_id).into());
        }

        self.with_conn(|conn| {
            for id in [task_id, depends_on_id] {
                if get_task_internal(conn, id)?.is_none() {
                    return Err(ToolError::task_not_found(id).into());
                }
            }

            if would_create_cycle(conn, task_id, depends_on_id)? {
                return Err(ToolError::dependency_cycle(task_id, depends_on_id).into());
            }

            conn.execute(
                "INSERT OR IGNORE INTO dependencies (task_id, depends_on_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![task_id, depends_on_id, now_ms()],
            )?;
            Ok(())
        })
    }

    /// Remove a dependency. Returns whether an edge was removed.
    pub fn remove_dependency(&self, task_id: &str, depends_on_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM dependencies WHERE task_id = ?1 AND depends_on_id = ?2",
                params![task_id, depends_on_id],
            )?;
            Ok(removed > 0)
        })
    }

    /// Get the ids a task depends on, in insertion order.
    pub fn get_dependency_ids(&self, task_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| dependency_ids_internal(conn, task_id))
    }

    /// Get the ids of tasks that depend on the given task.
    pub fn get_dependents(&self, task_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT task_id FROM dependencies WHERE depends_on_id = ?1 ORDER BY rowid",
            )?;
            let ids = stmt
                .query_map(params![task_id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
    }
}
