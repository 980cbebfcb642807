//! End-to-end tests for the MCP tool handler.

use serde_json::{Value, json};
use std::sync::Arc;
use task_deps_mcp::config::Config;
use task_deps_mcp::db::Database;
use task_deps_mcp::error::{ErrorCode, ToolError};
use task_deps_mcp::tools::ToolHandler;

fn setup_handler() -> ToolHandler {
    let db = Database::open_in_memory().expect("Failed to create in-memory database");
    ToolHandler::new(Arc::new(db), Arc::new(Config::default()))
}

async fn call(handler: &ToolHandler, name: &str, args: Value) -> Value {
    handler
        .call_tool(name, args)
        .await
        .unwrap_or_else(|e| panic!("{} failed: {}", name, e))
}

async fn call_err(handler: &ToolHandler, name: &str, args: Value) -> ToolError {
    let err = handler
        .call_tool(name, args)
        .await
        .expect_err("tool call should fail");
    ToolError::from(err)
}

#[tokio::test]
async fn lists_every_tool() {
    let handler = setup_handler();
    let names: Vec<String> = handler
        .get_tools()
        .into_iter()
        .map(|t| t.name.to_string())
        .collect();

    for expected in [
        "create",
        "get",
        "list_tasks",
        "update",
        "delete",
        "link",
        "unlink",
        "dependencies",
        "analyze_dependencies",
        "suggest_dependencies",
        "dependency_metrics",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing tool {}", expected);
    }
}

#[tokio::test]
async fn create_link_and_resolve() {
    let handler = setup_handler();
    call(&handler, "create", json!({"id": "schema", "title": "Design schema", "status": "done"})).await;
    call(&handler, "create", json!({"id": "api", "title": "Build API"})).await;
    call(&handler, "create", json!({"id": "ui", "title": "Build UI"})).await;

    let linked = call(
        &handler,
        "link",
        json!({"task": ["api", "ui"], "depends_on": "schema"}),
    )
    .await;
    assert_eq!(linked["success"], true);
    assert_eq!(linked["created"].as_array().unwrap().len(), 2);

    let rel = call(&handler, "dependencies", json!({"task": "schema"})).await;
    assert_eq!(rel["resolution"], "resolved");
    assert_eq!(rel["is_blocking_others"], true);
    assert_eq!(rel["blocks"].as_array().unwrap().len(), 2);

    let rel = call(&handler, "dependencies", json!({"task": "api"})).await;
    assert_eq!(rel["can_start"], true);
    assert_eq!(rel["depends_on"][0]["task_id"], "schema");

    let md = call(
        &handler,
        "dependencies",
        json!({"task": "api", "format": "markdown"}),
    )
    .await;
    assert_eq!(md["format"], "markdown");
    assert!(md["content"].as_str().unwrap().contains("### Depends on"));
}

#[tokio::test]
async fn link_reports_cycles_per_pair() {
    let handler = setup_handler();
    call(&handler, "create", json!({"id": "a", "title": "A"})).await;
    call(&handler, "create", json!({"id": "b", "title": "B", "depends_on": ["a"]})).await;

    let result = call(&handler, "link", json!({"task": "a", "depends_on": "b"})).await;
    assert_eq!(result["success"], false);
    assert_eq!(result["errors"][0]["error"]["code"], "DEPENDENCY_CYCLE");

    let unlinked = call(&handler, "unlink", json!({"task": "b", "depends_on": ["a"]})).await;
    assert_eq!(unlinked["removed"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn get_embeds_dependencies_on_request() {
    let handler = setup_handler();
    call(&handler, "create", json!({"id": "a", "title": "A", "status": "in_progress"})).await;
    call(&handler, "create", json!({"id": "b", "title": "B", "depends_on": ["a"]})).await;

    let plain = call(&handler, "get", json!({"task": "b"})).await;
    assert_eq!(plain["dependencies"], json!(["a"]));

    let full = call(&handler, "get", json!({"task": "b", "dependencies": true})).await;
    assert_eq!(full["dependencies"]["can_start"], false);
    assert_eq!(full["dependencies"]["blocking_reasons"][0], "'A' (in_progress)");
}

#[tokio::test]
async fn errors_carry_codes() {
    let handler = setup_handler();

    let err = call_err(&handler, "get", json!({})).await;
    assert_eq!(err.code, ErrorCode::MissingRequiredField);

    let err = call_err(&handler, "dependencies", json!({"task": "ghost"})).await;
    assert_eq!(err.code, ErrorCode::TaskNotFound);

    let err = call_err(&handler, "create", json!({"title": "x", "status": "sleeping"})).await;
    assert_eq!(err.code, ErrorCode::InvalidFieldValue);

    let err = call_err(&handler, "nonsense", json!({})).await;
    assert_eq!(err.code, ErrorCode::UnknownTool);
}

#[tokio::test]
async fn analyze_never_fails_and_counts_metrics() {
    let handler = setup_handler();
    call(
        &handler,
        "create",
        json!({"id": "gw", "title": "Payment gateway setup", "assignees": ["alice"]}),
    )
    .await;
    call(
        &handler,
        "create",
        json!({
            "id": "billing",
            "title": "Integrate billing",
            "description": "This requires Payment gateway setup",
            "assignees": ["alice"]
        }),
    )
    .await;

    let analysis = call(&handler, "analyze_dependencies", json!({"task": "billing"})).await;
    assert_eq!(analysis["ai_suggestions"][0]["suggested_dependency_id"], "gw");

    let missing = call(&handler, "analyze_dependencies", json!({"task": "ghost"})).await;
    assert!(missing["degraded_reason"].as_str().unwrap().contains("ghost"));

    let suggestions = call(&handler, "suggest_dependencies", json!({"task": "billing"})).await;
    assert_eq!(suggestions["count"], 1);

    let metrics = call(&handler, "dependency_metrics", json!({"reset": true})).await;
    assert_eq!(metrics["suggestions_generated"], 2);
    let metrics = call(&handler, "dependency_metrics", json!({})).await;
    assert_eq!(metrics["suggestions_generated"], 0);
}

#[tokio::test]
async fn user_scoped_analysis_is_counted_in_metrics() {
    let handler = setup_handler();
    call(
        &handler,
        "create",
        json!({"id": "gw", "title": "Payment gateway setup", "user": "u1"}),
    )
    .await;
    call(
        &handler,
        "create",
        json!({
            "id": "billing",
            "title": "Integrate billing",
            "description": "This requires Payment gateway setup",
            "user": "u1"
        }),
    )
    .await;

    let analysis = call(
        &handler,
        "analyze_dependencies",
        json!({"task": "billing", "user": "u1"}),
    )
    .await;
    assert_eq!(analysis["ai_suggestions"].as_array().unwrap().len(), 1);

    let metrics = call(&handler, "dependency_metrics", json!({})).await;
    assert_eq!(metrics["suggestions_generated"], 1);
}

#[tokio::test]
async fn list_update_delete() {
    let handler = setup_handler();
    call(&handler, "create", json!({"id": "a", "title": "A", "user": "u1"})).await;
    call(&handler, "create", json!({"id": "b", "title": "B", "user": "u2"})).await;

    let updated = call(&handler, "update", json!({"task": "a", "status": "done", "progress": 100})).await;
    assert_eq!(updated["status"], "done");

    let done = call(&handler, "list_tasks", json!({"status": ["done"]})).await;
    assert_eq!(done["count"], 1);
    let u2 = call(&handler, "list_tasks", json!({"user": "u2"})).await;
    assert_eq!(u2["tasks"][0]["id"], "b");

    call(&handler, "delete", json!({"task": "a"})).await;
    let err = call_err(&handler, "delete", json!({"task": "a"})).await;
    assert_eq!(err.code, ErrorCode::TaskNotFound);
}
