//! Dependency management and analysis tools.

use super::{get_bool, get_id_list, get_string, make_tool};
use crate::db::Database;
use crate::deps::DependencyManagementEngine;
use crate::error::ToolError;
use crate::format::{
    OutputFormat, format_relationships_markdown, format_suggestions_markdown, markdown_to_json,
};
use anyhow::Result;
use rmcp::model::Tool;
use serde_json::{Value, json};

fn id_or_ids(description: &str) -> Value {
    json!({
        "oneOf": [
            { "type": "string" },
            { "type": "array", "items": { "type": "string" } }
        ],
        "description": description
    })
}

pub fn get_tools() -> Vec<Tool> {
    vec![
        make_tool(
            "link",
            "Declare that task(s) depend on other task(s). Supports bulk: task and depends_on accept string or array. Example: link(task=['A','B'], depends_on='C') makes A and B wait for C.",
            json!({
                "task": id_or_ids("Dependent task ID(s)"),
                "depends_on": id_or_ids("Prerequisite task ID(s)")
            }),
            vec!["task", "depends_on"],
        ),
        make_tool(
            "unlink",
            "Remove dependency links. Supports bulk: task and depends_on accept string or array.",
            json!({
                "task": id_or_ids("Dependent task ID(s)"),
                "depends_on": id_or_ids("Prerequisite task ID(s)")
            }),
            vec!["task", "depends_on"],
        ),
        make_tool(
            "dependencies",
            "Resolve a task's dependency relationships: what it waits on, what it blocks, upstream and downstream chains, and next actions.",
            json!({
                "task": { "type": "string", "description": "Task ID" },
                "user": { "type": "string", "description": "Only consider tasks owned by this user" },
                "format": { "type": "string", "enum": ["json", "markdown"], "description": "Output format" }
            }),
            vec!["task"],
        ),
        make_tool(
            "analyze_dependencies",
            "Resolve dependency relationships and add ranked dependency suggestions inferred from task content. Never fails for an existing task.",
            json!({
                "task": { "type": "string", "description": "Task ID" },
                "user": { "type": "string", "description": "Only consider tasks owned by this user" }
            }),
            vec!["task"],
        ),
        make_tool(
            "suggest_dependencies",
            "Suggest likely dependencies for a task from keywords, shared files and shared assignees, highest confidence first.",
            json!({
                "task": { "type": "string", "description": "Task ID" },
                "user": { "type": "string", "description": "Only consider tasks owned by this user" },
                "format": { "type": "string", "enum": ["json", "markdown"], "description": "Output format (default: json)" }
            }),
            vec!["task"],
        ),
        make_tool(
            "dependency_metrics",
            "Read the dependency engine's performance counters.",
            json!({
                "reset": { "type": "boolean", "description": "Reset counters after reading (default: false)" }
            }),
            vec![],
        ),
    ]
}

pub fn link(db: &Database, args: Value) -> Result<Value> {
    let task_ids = get_id_list(&args, "task")?;
    let dep_ids = get_id_list(&args, "depends_on")?;

    let mut created = Vec::new();
    let mut errors = Vec::new();

    for task_id in &task_ids {
        for dep_id in &dep_ids {
            match db.add_dependency(task_id, dep_id) {
                Ok(()) => created.push(json!({
                    "task": task_id,
                    "depends_on": dep_id
                })),
                Err(e) => errors.push(json!({
                    "task": task_id,
                    "depends_on": dep_id,
                    "error": ToolError::from(e)
                })),
            }
        }
    }

    Ok(json!({
        "success": errors.is_empty(),
        "created": created,
        "errors": errors
    }))
}

pub fn unlink(db: &Database, args: Value) -> Result<Value> {
    let task_ids = get_id_list(&args, "task")?;
    let dep_ids = get_id_list(&args, "depends_on")?;

    let mut removed = Vec::new();
    let mut missing = Vec::new();

    for task_id in &task_ids {
        for dep_id in &dep_ids {
            let pair = json!({
                "task": task_id,
                "depends_on": dep_id
            });
            if db.remove_dependency(task_id, dep_id)? {
                removed.push(pair);
            } else {
                missing.push(pair);
            }
        }
    }

    Ok(json!({
        "success": missing.is_empty(),
        "removed": removed,
        "not_found": missing
    }))
}

/// The engine, narrowed to one user's tasks when `user` is given.
fn scoped<'a>(
    engine: &'a DependencyManagementEngine,
    args: &Value,
    owned: &'a mut Option<DependencyManagementEngine>,
) -> &'a DependencyManagementEngine {
    match get_string(args, "user") {
        Some(user_id) => owned.insert(engine.with_user(&user_id)),
        None => engine,
    }
}

pub fn dependencies(
    engine: &DependencyManagementEngine,
    default_format: OutputFormat,
    args: Value,
) -> Result<Value> {
    let task_id = get_string(&args, "task").ok_or_else(|| ToolError::missing_field("task"))?;
    let format = get_string(&args, "format")
        .and_then(|s| OutputFormat::from_str(&s))
        .unwrap_or(default_format);

    let mut owned = None;
    let engine = scoped(engine, &args, &mut owned);
    let resolution = engine.resolver().resolve_dependencies(&task_id)?;

    match format {
        OutputFormat::Markdown => Ok(markdown_to_json(format_relationships_markdown(
            resolution.relationships(),
        ))),
        OutputFormat::Json => Ok(serde_json::to_value(resolution)?),
    }
}

pub async fn analyze_dependencies(
    engine: &DependencyManagementEngine,
    args: Value,
) -> Result<Value> {
    let task_id = get_string(&args, "task").ok_or_else(|| ToolError::missing_field("task"))?;

    let enhanced = match get_string(&args, "user") {
        Some(user_id) => {
            engine
                .with_user(&user_id)
                .resolve_dependencies_with_ai(&task_id)
                .await
        }
        None => engine.resolve_dependencies_with_ai(&task_id).await,
    };

    Ok(serde_json::to_value(enhanced)?)
}

pub fn suggest_dependencies(engine: &DependencyManagementEngine, args: Value) -> Result<Value> {
    let task_id = get_string(&args, "task").ok_or_else(|| ToolError::missing_field("task"))?;
    let format = get_string(&args, "format")
        .and_then(|s| OutputFormat::from_str(&s))
        .unwrap_or(OutputFormat::Json);

    let mut owned = None;
    let engine = scoped(engine, &args, &mut owned);
    let suggestions = engine.suggest_dependencies(&task_id)?;

    match format {
        OutputFormat::Markdown => Ok(markdown_to_json(format_suggestions_markdown(
            &task_id,
            &suggestions,
        ))),
        OutputFormat::Json => Ok(json!({
            "task_id": task_id,
            "count": suggestions.len(),
            "suggestions": suggestions
        })),
    }
}

pub fn dependency_metrics(engine: &DependencyManagementEngine, args: Value) -> Result<Value> {
    let metrics = engine.get_performance_metrics();
    if get_bool(&args, "reset").unwrap_or(false) {
        engine.reset_performance_metrics();
    }
    Ok(serde_json::to_value(metrics)?)
}
