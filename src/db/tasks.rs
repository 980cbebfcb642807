//! Task CRUD operations.

use super::{Database, now_ms};
use crate::error::ToolError;
use crate::types::{NewTask, Task, TaskFilter, TaskPriority, TaskStatus, TaskUpdate};
use anyhow::Result;
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{Connection, Row, params, params_from_iter};
use std::collections::HashMap;
use uuid::Uuid;

/// A stored text value that does not parse into its column's type.
fn corrupt_column(row: &Row, column: &str, value: &str) -> rusqlite::Error {
    let idx = row.as_ref().column_index(column).unwrap_or_default();
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("invalid {} value {:?}", column, value).into(),
    )
}

/// Parse a task row. Dependencies are loaded separately.
pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let status: String = row.get("status")?;
    let priority: String = row.get("priority")?;
    let assignees_json: String = row.get("assignees")?;

    let status =
        TaskStatus::from_str(&status).ok_or_else(|| corrupt_column(row, "status", &status))?;
    let priority = TaskPriority::from_str(&priority)
        .ok_or_else(|| corrupt_column(row, "priority", &priority))?;
    let assignees: Vec<String> = serde_json::from_str(&assignees_json)
        .map_err(|_| corrupt_column(row, "assignees", &assignees_json))?;

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        details: row.get("details")?,
        status,
        priority,
        overall_progress: row.get("overall_progress")?,
        estimated_effort: row.get("estimated_effort")?,
        assignees,
        dependencies: Vec::new(),
        user_id: row.get("user_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Dependency ids of one task, in insertion order.
pub(crate) fn dependency_ids_internal(conn: &Connection, task_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT depends_on_id FROM dependencies WHERE task_id = ?1 ORDER BY rowid")?;
    let ids = stmt
        .query_map(params![task_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

/// Every dependency edge grouped by dependent task.
fn all_dependency_ids_internal(conn: &Connection) -> Result<HashMap<String, Vec<String>>> {
    let mut stmt = conn.prepare("SELECT task_id, depends_on_id FROM dependencies ORDER BY rowid")?;
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (task_id, depends_on_id) = row?;
        map.entry(task_id).or_default().push(depends_on_id);
    }
    Ok(map)
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
pub(crate) fn get_task_internal(conn: &Connection, task_id: &str) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;

    match stmt.query_row(params![task_id], parse_task_row) {
        Ok(mut task) => {
            task.dependencies = dependency_ids_internal(conn, task_id)?;
            Ok(Some(task))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Internal helper to list tasks with their dependencies attached.
pub(crate) fn list_tasks_internal(conn: &Connection, filter: &TaskFilter) -> Result<Vec<Task>> {
    let mut sql = String::from("SELECT * FROM tasks WHERE 1=1");
    let mut values: Vec<SqlValue> = Vec::new();

    if let Some(ref statuses) = filter.status {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        sql.push_str(&format!(" AND status IN ({})", placeholders));
        values.extend(statuses.iter().map(|s| SqlValue::Text(s.as_str().to_string())));
    }

    if let Some(ref user_id) = filter.user_id {
        sql.push_str(" AND user_id = ?");
        values.push(SqlValue::Text(user_id.clone()));
    }

    sql.push_str(" ORDER BY created_at, id");

    let mut stmt = conn.prepare(&sql)?;
    let mut tasks = stmt
        .query_map(params_from_iter(values), parse_task_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    // Assignees are a JSON column, filter after decoding
    if let Some(ref assignee) = filter.assignee {
        tasks.retain(|t| t.assignees.iter().any(|a| a == assignee));
    }

    if let Some(limit) = filter.limit {
        tasks.truncate(limit.max(0) as usize);
    }

    let mut deps = all_dependency_ids_internal(conn)?;
    for task in &mut tasks {
        task.dependencies = deps.remove(&task.id).unwrap_or_default();
    }

    Ok(tasks)
}

impl Database {
    /// Create a new task.
    /// If id is provided, uses it as the task ID; otherwise generates UUID7.
    /// Initial dependencies must reference existing tasks.
    pub fn create_task(&self, input: NewTask) -> Result<Task> {
        if input.title.trim().is_empty() {
            return Err(ToolError::missing_field("title").into());
        }

        let task_id = input.id.unwrap_or_else(|| Uuid::now_v7().to_string());
        let now = now_ms();
        let assignees_json = serde_json::to_string(&input.assignees)?;
        let progress = input.overall_progress.unwrap_or(0).clamp(0, 100);

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if get_task_internal(&tx, &task_id)?.is_some() {
                return Err(ToolError::already_exists(&task_id).into());
            }

            tx.execute(
                "INSERT INTO tasks (
                    id, title, description, details, status, priority, overall_progress,
                    estimated_effort, assignees, user_id, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    &task_id,
                    &input.title,
                    &input.description,
                    &input.details,
                    input.status.unwrap_or_default().as_str(),
                    input.priority.unwrap_or_default().as_str(),
                    progress,
                    &input.estimated_effort,
                    assignees_json,
                    &input.user_id,
                    now,
                    now,
                ],
            )?;

            for dep_id in &input.dependencies {
                if dep_id == &task_id {
                    return Err(ToolError::dependency_cycle(&task_id, dep_id).into());
                }
                if get_task_internal(&tx, dep_id)?.is_none() {
                    return Err(ToolError::task_not_found(dep_id).into());
                }
                tx.execute(
                    "INSERT OR IGNORE INTO dependencies (task_id, depends_on_id, created_at)
                     VALUES (?1, ?2, ?3)",
                    params![&task_id, dep_id, now],
                )?;
            }

            let task = get_task_internal(&tx, &task_id)?
                .ok_or_else(|| ToolError::task_not_found(&task_id))?;
            tx.commit()?;
            Ok(task)
        })
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// List tasks matching the filter, oldest first.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        self.with_conn(|conn| list_tasks_internal(conn, filter))
    }

    /// Apply a partial update to a task.
    pub fn update_task(&self, task_id: &str, update: TaskUpdate) -> Result<Task> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let mut task = get_task_internal(&tx, task_id)?
                .ok_or_else(|| ToolError::task_not_found(task_id))?;

            if let Some(title) = update.title {
                if title.trim().is_empty() {
                    return Err(ToolError::invalid_value("title", "title cannot be empty").into());
                }
                task.title = title;
            }
            if let Some(description) = update.description {
                task.description = Some(description);
            }
            if let Some(details) = update.details {
                task.details = Some(details);
            }
            if let Some(status) = update.status {
                task.status = status;
            }
            if let Some(priority) = update.priority {
                task.priority = priority;
            }
            if let Some(progress) = update.overall_progress {
                task.overall_progress = progress.clamp(0, 100);
            }
            if let Some(effort) = update.estimated_effort {
                task.estimated_effort = Some(effort);
            }
            if let Some(assignees) = update.assignees {
                task.assignees = assignees;
            }
            task.updated_at = now_ms();

            tx.execute(
                "UPDATE tasks SET title = ?1, description = ?2, details = ?3, status = ?4,
                    priority = ?5, overall_progress = ?6, estimated_effort = ?7,
                    assignees = ?8, updated_at = ?9
                 WHERE id = ?10",
                params![
                    &task.title,
                    &task.description,
                    &task.details,
                    task.status.as_str(),
                    task.priority.as_str(),
                    task.overall_progress,
                    &task.estimated_effort,
                    serde_json::to_string(&task.assignees)?,
                    task.updated_at,
                    task_id,
                ],
            )?;

            tx.commit()?;
            Ok(task)
        })
    }

    /// Delete a task. Its dependency edges go with it.
    pub fn delete_task(&self, task_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            Ok(deleted > 0)
        })
    }
}
