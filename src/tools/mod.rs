//! MCP tool implementations.

pub mod deps;
pub mod tasks;

use crate::config::Config;
use crate::db::Database;
use crate::deps::{DependencyManagementEngine, TaskRepository};
use crate::error::ToolError;
use anyhow::Result;
use rmcp::model::Tool;
use serde_json::Value;
use std::sync::Arc;

/// Tool handler that processes MCP tool calls.
pub struct ToolHandler {
    pub db: Arc<Database>,
    pub engine: Arc<DependencyManagementEngine>,
    pub config: Arc<Config>,
}

impl ToolHandler {
    pub fn new(db: Arc<Database>, config: Arc<Config>) -> Self {
        let engine = Arc::new(build_engine(&db, &config));
        Self { db, engine, config }
    }

    /// Get all available tools.
    pub fn get_tools(&self) -> Vec<Tool> {
        let mut tools = Vec::new();
        tools.extend(tasks::get_tools());
        tools.extend(deps::get_tools());
        tools
    }

    /// Call a tool by name.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        match name {
            // Task tools
            "create" => tasks::create(&self.db, arguments),
            "get" => tasks::get(&self.db, &self.engine, arguments),
            "list_tasks" => tasks::list_tasks(&self.db, arguments),
            "update" => tasks::update(&self.db, arguments),
            "delete" => tasks::delete(&self.db, arguments),

            // Dependency tools
            "link" => deps::link(&self.db, arguments),
            "unlink" => deps::unlink(&self.db, arguments),
            "dependencies" => {
                deps::dependencies(&self.engine, self.config.server.default_format, arguments)
            }
            "analyze_dependencies" => deps::analyze_dependencies(&self.engine, arguments).await,
            "suggest_dependencies" => deps::suggest_dependencies(&self.engine, arguments),
            "dependency_metrics" => deps::dependency_metrics(&self.engine, arguments),

            _ => Err(ToolError::unknown_tool(name).into()),
        }
    }
}

/// Build the engine over `db` with the configured analysis settings.
pub fn build_engine(db: &Database, config: &Config) -> DependencyManagementEngine {
    let repo: Arc<dyn TaskRepository> = Arc::new(db.clone());
    let analysis = &config.analysis;
    DependencyManagementEngine::from_parts(
        crate::deps::DependencyResolver::new(Arc::clone(&repo)).with_max_depth(analysis.max_depth),
        crate::deps::ContentAnalyzer::new(repo).with_proximity_window(analysis.proximity_window),
    )
    .with_max_suggestions(analysis.max_suggestions)
    .with_high_confidence_threshold(analysis.high_confidence_threshold)
}

/// Helper to create a tool definition.
pub fn make_tool(name: &str, description: &str, properties: Value, required: Vec<&str>) -> Tool {
    let input_schema = rmcp::model::JsonObject::from_iter([
        ("type".to_string(), serde_json::json!("object")),
        ("properties".to_string(), properties),
        ("required".to_string(), serde_json::json!(required)),
    ]);

    Tool::new(name.to_string(), description.to_string(), input_schema)
}

/// Helper to get a string from arguments.
pub fn get_string(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str().map(String::from))
}

/// Helper to get an i32 from arguments.
pub fn get_i32(args: &Value, key: &str) -> Option<i32> {
    args.get(key).and_then(|v| v.as_i64().map(|n| n as i32))
}

/// Helper to get an i64 from arguments.
pub fn get_i64(args: &Value, key: &str) -> Option<i64> {
    args.get(key).and_then(|v| v.as_i64())
}

/// Helper to get a bool from arguments.
pub fn get_bool(args: &Value, key: &str) -> Option<bool> {
    args.get(key).and_then(|v| v.as_bool())
}

/// Helper to get a string array from arguments.
pub fn get_string_array(args: &Value, key: &str) -> Option<Vec<String>> {
    args.get(key).and_then(|v| {
        v.as_array().map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
    })
}

/// Read a required argument that may be a single id or an array of ids.
pub fn get_id_list(args: &Value, key: &str) -> Result<Vec<String>> {
    let ids = match get_string_array(args, key) {
        Some(ids) => ids,
        None => match get_string(args, key) {
            Some(id) => vec![id],
            None => return Err(ToolError::missing_field(key).into()),
        },
    };

    if ids.is_empty() {
        return Err(ToolError::invalid_value(
            key,
            &format!("At least one '{}' task ID must be provided", key),
        )
        .into());
    }
    Ok(ids)
}
