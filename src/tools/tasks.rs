//! Task CRUD tools.

use super::{get_bool, get_i32, get_i64, get_string, get_string_array, make_tool};
use crate::db::Database;
use crate::deps::{DependencyManagementEngine, DependencyRelationships};
use crate::error::ToolError;
use crate::format::{OutputFormat, format_task_markdown, markdown_to_json};
use crate::types::{NewTask, TaskFilter, TaskPriority, TaskStatus, TaskUpdate};
use anyhow::Result;
use rmcp::model::Tool;
use serde_json::{Value, json};
use tracing::warn;

pub fn get_tools() -> Vec<Tool> {
    let status_names: Vec<&str> = TaskStatus::ALL.iter().map(|s| s.as_str()).collect();
    let priority_names = ["low", "medium", "high", "urgent", "critical"];

    vec![
        make_tool(
            "create",
            "Create a new task. Use depends_on to declare tasks that must finish first.",
            json!({
                "id": { "type": "string", "description": "Custom task ID (UUID7 generated if omitted)" },
                "title": { "type": "string", "description": "Task title" },
                "description": { "type": "string", "description": "Task description" },
                "details": { "type": "string", "description": "Implementation details" },
                "status": { "type": "string", "enum": status_names, "description": "Initial status (default: todo)" },
                "priority": { "type": "string", "enum": priority_names, "description": "Task priority (default: medium)" },
                "progress": { "type": "integer", "description": "Completion percentage 0-100" },
                "estimated_effort": { "type": "string", "description": "Free-form effort estimate" },
                "assignees": { "type": "array", "items": { "type": "string" }, "description": "Assigned agents" },
                "depends_on": { "type": "array", "items": { "type": "string" }, "description": "Task IDs this task depends on" },
                "user": { "type": "string", "description": "Owning user ID" }
            }),
            vec!["title"],
        ),
        make_tool(
            "get",
            "Get a task by ID. Set dependencies=true to embed its resolved dependency relationships.",
            json!({
                "task": { "type": "string", "description": "Task ID" },
                "dependencies": { "type": "boolean", "description": "Include dependency relationships (default: false)" },
                "format": { "type": "string", "enum": ["json", "markdown"], "description": "Output format (default: json)" }
            }),
            vec!["task"],
        ),
        make_tool(
            "list_tasks",
            "List tasks, optionally filtered by status, assignee or owning user.",
            json!({
                "status": {
                    "oneOf": [
                        { "type": "string" },
                        { "type": "array", "items": { "type": "string" } }
                    ],
                    "description": "Status or statuses to include"
                },
                "assignee": { "type": "string", "description": "Only tasks assigned to this agent" },
                "user": { "type": "string", "description": "Only tasks owned by this user" },
                "limit": { "type": "integer", "description": "Maximum tasks to return" }
            }),
            vec![],
        ),
        make_tool(
            "update",
            "Update a task's fields. Omitted fields are left unchanged.",
            json!({
                "task": { "type": "string", "description": "Task ID" },
                "title": { "type": "string" },
                "description": { "type": "string" },
                "details": { "type": "string" },
                "status": { "type": "string", "enum": status_names },
                "priority": { "type": "string", "enum": priority_names },
                "progress": { "type": "integer", "description": "Completion percentage 0-100" },
                "estimated_effort": { "type": "string" },
                "assignees": { "type": "array", "items": { "type": "string" } }
            }),
            vec!["task"],
        ),
        make_tool(
            "delete",
            "Delete a task. Dependency links to and from it are removed.",
            json!({
                "task": { "type": "string", "description": "Task ID" }
            }),
            vec!["task"],
        ),
    ]
}

fn parse_status(args: &Value) -> Result<Option<TaskStatus>> {
    match get_string(args, "status") {
        Some(s) => TaskStatus::from_str(&s)
            .map(Some)
            .ok_or_else(|| ToolError::invalid_value("status", &format!("Unknown status: {}", s)).into()),
        None => Ok(None),
    }
}

fn parse_priority(args: &Value) -> Result<Option<TaskPriority>> {
    match get_string(args, "priority") {
        Some(s) => TaskPriority::from_str(&s)
            .map(Some)
            .ok_or_else(|| ToolError::invalid_value("priority", &format!("Unknown priority: {}", s)).into()),
        None => Ok(None),
    }
}

pub fn create(db: &Database, args: Value) -> Result<Value> {
    let title = get_string(&args, "title").ok_or_else(|| ToolError::missing_field("title"))?;

    let task = db.create_task(NewTask {
        id: get_string(&args, "id"),
        title,
        description: get_string(&args, "description"),
        details: get_string(&args, "details"),
        status: parse_status(&args)?,
        priority: parse_priority(&args)?,
        overall_progress: get_i32(&args, "progress"),
        estimated_effort: get_string(&args, "estimated_effort"),
        assignees: get_string_array(&args, "assignees").unwrap_or_default(),
        dependencies: get_string_array(&args, "depends_on").unwrap_or_default(),
        user_id: get_string(&args, "user"),
    })?;

    Ok(json!({
        "task_id": &task.id,
        "title": task.title,
        "status": task.status.as_str(),
        "priority": task.priority.as_str(),
        "depends_on": task.dependencies,
        "created_at": task.created_at
    }))
}

pub fn get(db: &Database, engine: &DependencyManagementEngine, args: Value) -> Result<Value> {
    let task_id = get_string(&args, "task").ok_or_else(|| ToolError::missing_field("task"))?;
    let include_deps = get_bool(&args, "dependencies").unwrap_or(false);
    let format = get_string(&args, "format")
        .and_then(|s| OutputFormat::from_str(&s))
        .unwrap_or(OutputFormat::Json);

    let task = db
        .get_task(&task_id)?
        .ok_or_else(|| ToolError::task_not_found(&task_id))?;

    if format == OutputFormat::Markdown {
        let mut md = format_task_markdown(&task);
        if include_deps {
            md.push('\n');
            md.push_str(&crate::format::format_relationships_markdown(
                &embedded_relationships(engine, &task_id),
            ));
        }
        return Ok(markdown_to_json(md));
    }

    let mut task_json = serde_json::to_value(&task)?;
    if include_deps {
        let relationships = embedded_relationships(engine, &task_id);
        if let Some(obj) = task_json.as_object_mut() {
            obj.insert("dependencies".to_string(), serde_json::to_value(relationships)?);
        }
    }
    Ok(task_json)
}

/// Relationships for embedding in a task payload. Never fails the read.
fn embedded_relationships(engine: &DependencyManagementEngine, task_id: &str) -> DependencyRelationships {
    match engine.resolver().resolve_dependencies(task_id) {
        Ok(resolution) => resolution.into_relationships(),
        Err(e) => {
            warn!(task_id = %task_id, error = %e, "Embedding unresolved dependencies");
            DependencyRelationships::unresolved(task_id)
        }
    }
}

pub fn list_tasks(db: &Database, args: Value) -> Result<Value> {
    let status = match get_string_array(&args, "status") {
        Some(names) => Some(names),
        None => get_string(&args, "status").map(|s| vec![s]),
    };
    let status = match status {
        Some(names) => {
            let mut parsed = Vec::with_capacity(names.len());
            for name in names {
                let s = TaskStatus::from_str(&name).ok_or_else(|| {
                    ToolError::invalid_value("status", &format!("Unknown status: {}", name))
                })?;
                parsed.push(s);
            }
            Some(parsed)
        }
        None => None,
    };

    let tasks = db.list_tasks(&TaskFilter {
        status,
        assignee: get_string(&args, "assignee"),
        user_id: get_string(&args, "user"),
        limit: get_i64(&args, "limit"),
    })?;

    Ok(json!({
        "count": tasks.len(),
        "tasks": tasks
    }))
}

pub fn update(db: &Database, args: Value) -> Result<Value> {
    let task_id = get_string(&args, "task").ok_or_else(|| ToolError::missing_field("task"))?;

    let task = db.update_task(
        &task_id,
        TaskUpdate {
            title: get_string(&args, "title"),
            description: get_string(&args, "description"),
            details: get_string(&args, "details"),
            status: parse_status(&args)?,
            priority: parse_priority(&args)?,
            overall_progress: get_i32(&args, "progress"),
            estimated_effort: get_string(&args, "estimated_effort"),
            assignees: get_string_array(&args, "assignees"),
        },
    )?;

    Ok(serde_json::to_value(task)?)
}

pub fn delete(db: &Database, args: Value) -> Result<Value> {
    let task_id = get_string(&args, "task").ok_or_else(|| ToolError::missing_field("task"))?;

    if !db.delete_task(&task_id)? {
        return Err(ToolError::task_not_found(&task_id).into());
    }

    Ok(json!({
        "success": true,
        "task_id": task_id
    }))
}
