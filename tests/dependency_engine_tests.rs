//! Integration tests for the dependency management engine.

use std::sync::Arc;
use task_deps_mcp::deps::{
    DependencyManagementEngine, InMemoryTaskRepository, SuggestionStatus, SuggestionType,
};
use task_deps_mcp::error::DependencyError;
use task_deps_mcp::types::{Task, TaskPriority, TaskStatus};

fn task(id: &str, title: &str, description: &str) -> Task {
    Task {
        id: id.to_string(),
        title: title.to_string(),
        description: Some(description.to_string()),
        details: None,
        status: TaskStatus::Todo,
        priority: TaskPriority::Medium,
        overall_progress: 0,
        estimated_effort: None,
        assignees: vec![],
        dependencies: vec![],
        user_id: None,
        created_at: 1_000,
        updated_at: 1_000,
    }
}

fn engine(tasks: Vec<Task>) -> DependencyManagementEngine {
    DependencyManagementEngine::new(Arc::new(InMemoryTaskRepository::new(tasks)))
}

#[tokio::test]
async fn missing_task_degrades_instead_of_failing() {
    let engine = engine(vec![task("a", "Alpha", "")]);

    let enhanced = engine.resolve_dependencies_with_ai("nonexistent-id").await;

    assert_eq!(enhanced.relationships.task_id, "nonexistent-id");
    assert!(enhanced.relationships.can_start);
    assert!(enhanced.ai_suggestions.is_empty());
    assert_eq!(enhanced.optimization_score, 0.0);
    let reason = enhanced.degraded_reason.expect("degraded result explains itself");
    assert!(reason.contains("Task not found"));
    assert!(enhanced.suggestion_summary.contains("unavailable"));
}

#[tokio::test]
async fn keyword_suggestion_is_ranked_and_scored() {
    let engine = engine(vec![
        task(
            "billing",
            "Integrate billing",
            "This requires Payment gateway setup to be finished",
        ),
        task("gateway", "Payment gateway setup", "Configure the provider"),
        task("docs", "Write onboarding guide", "Explain the product"),
    ]);

    let enhanced = engine.resolve_dependencies_with_ai("billing").await;

    assert!(enhanced.degraded_reason.is_none());
    assert_eq!(enhanced.relationships.dependency_summary, "No dependencies");
    assert_eq!(enhanced.ai_suggestions.len(), 1);

    let suggestion = &enhanced.ai_suggestions[0];
    assert_eq!(suggestion.hint.suggested_dependency_id, "gateway");
    assert_eq!(suggestion.hint.suggestion_type, SuggestionType::Content);
    assert_eq!(suggestion.status, SuggestionStatus::Pending);
    assert!((suggestion.confidence_score() - 0.891).abs() < 1e-9);
    let target = suggestion.target_task_info.as_ref().expect("target loaded");
    assert_eq!(target.title, "Payment gateway setup");

    assert_eq!(enhanced.high_confidence_suggestions, 1);
    assert!((enhanced.optimization_score - (0.6 * 0.891 + 0.4)).abs() < 1e-9);
    assert_eq!(
        enhanced.suggestion_summary,
        "1 dependency suggestions (1 high confidence)"
    );

    let metrics = engine.get_performance_metrics();
    assert_eq!(metrics.suggestions_generated, 1);
    assert!(metrics.analysis_time >= 0.0);
}

#[test]
fn suggestions_are_sorted_and_capped() {
    let mut seed = task("seed", "Seed", "");
    seed.assignees = vec!["alice".to_string(), "bob".to_string()];
    seed.created_at = 100;

    let mut tasks = vec![seed];
    for i in 0..14 {
        let mut other = task(&format!("o{}", i), &format!("Other {}", i), "");
        other.assignees = if i % 3 == 0 {
            vec!["alice".to_string(), "bob".to_string()]
        } else {
            vec!["alice".to_string()]
        };
        other.created_at = if i % 2 == 0 { 50 } else { 200 };
        tasks.push(other);
    }
    let engine = engine(tasks);

    let suggestions = engine.suggest_dependencies("seed").unwrap();

    assert_eq!(suggestions.len(), 10);
    assert!(
        suggestions
            .windows(2)
            .all(|w| w[0].confidence_score() >= w[1].confidence_score())
    );
    // two shared agents, created earlier: 0.6 + 0.1
    assert!((suggestions[0].confidence_score() - 0.7).abs() < 1e-9);
    assert_eq!(engine.get_performance_metrics().suggestions_generated, 10);
}

#[test]
fn hints_for_the_same_target_are_merged() {
    let mut seed = task("seed", "Seed work", "This needs Shared setup first");
    seed.assignees = vec!["alice".to_string()];
    seed.created_at = 100;
    let mut other = task("other", "Shared setup", "");
    other.assignees = vec!["alice".to_string()];
    other.created_at = 50;
    let engine = engine(vec![seed, other]);

    let suggestions = engine.suggest_dependencies("seed").unwrap();

    assert_eq!(suggestions.len(), 1);
    // keyword "needs" (0.8 at distance 1) beats shared assignee (0.4)
    assert_eq!(suggestions[0].hint.suggestion_type, SuggestionType::Content);
    assert!((suggestions[0].confidence_score() - 0.792).abs() < 1e-9);
}

#[test]
fn suggest_for_missing_task_is_not_found() {
    let engine = engine(vec![]);
    assert!(matches!(
        engine.suggest_dependencies("ghost"),
        Err(DependencyError::TaskNotFound(_))
    ));
}

#[test]
fn max_suggestions_is_configurable() {
    let mut seed = task("seed", "Seed", "");
    seed.assignees = vec!["alice".to_string()];
    let mut tasks = vec![seed];
    for i in 0..5 {
        let mut other = task(&format!("o{}", i), &format!("Other {}", i), "");
        other.assignees = vec!["alice".to_string()];
        tasks.push(other);
    }
    let engine = engine(tasks).with_max_suggestions(2);

    assert_eq!(engine.suggest_dependencies("seed").unwrap().len(), 2);
}

#[tokio::test]
async fn metrics_reset() {
    let mut seed = task("seed", "Seed", "");
    seed.assignees = vec!["alice".to_string()];
    let mut other = task("other", "Other", "");
    other.assignees = vec!["alice".to_string()];
    let engine = engine(vec![seed, other]);

    engine.resolve_dependencies_with_ai("seed").await;
    engine.resolve_dependencies_with_ai("seed").await;
    let metrics = engine.get_performance_metrics();
    assert_eq!(metrics.suggestions_generated, 2);
    assert_eq!(metrics.suggestions_accepted, 0);

    engine.reset_performance_metrics();
    let metrics = engine.get_performance_metrics();
    assert_eq!(metrics.suggestions_generated, 0);
    assert_eq!(metrics.analysis_time, 0.0);
}

#[tokio::test]
async fn user_scoped_engine_ignores_other_users() {
    let mut mine = task("mine", "Mine", "");
    mine.assignees = vec!["alice".to_string()];
    mine.user_id = Some("u1".to_string());
    let mut theirs = task("theirs", "Theirs", "");
    theirs.assignees = vec!["alice".to_string()];
    theirs.user_id = Some("u2".to_string());
    let engine = engine(vec![mine, theirs]);

    assert_eq!(engine.suggest_dependencies("mine").unwrap().len(), 1);

    let scoped = engine.with_user("u1");
    let enhanced = scoped.resolve_dependencies_with_ai("mine").await;
    assert!(enhanced.ai_suggestions.is_empty());
    assert_eq!(enhanced.suggestion_summary, "No additional dependencies suggested");
}

#[tokio::test]
async fn user_scoped_engine_shares_metrics() {
    let mut seed = task("seed", "Seed", "");
    seed.assignees = vec!["alice".to_string()];
    seed.user_id = Some("u1".to_string());
    let mut other = task("other", "Other", "");
    other.assignees = vec!["alice".to_string()];
    other.user_id = Some("u1".to_string());
    let engine = engine(vec![seed, other]);

    let scoped = engine.with_user("u1");
    scoped.resolve_dependencies_with_ai("seed").await;
    assert_eq!(engine.get_performance_metrics().suggestions_generated, 1);

    engine.reset_performance_metrics();
    assert_eq!(scoped.get_performance_metrics().suggestions_generated, 0);
}

#[tokio::test]
async fn enhanced_result_serializes_flat() {
    let engine = engine(vec![task("a", "Alpha", "")]);
    let enhanced = engine.resolve_dependencies_with_ai("a").await;

    let json = serde_json::to_value(&enhanced).unwrap();
    assert_eq!(json["task_id"], "a");
    assert_eq!(json["can_start"], true);
    assert!(json["ai_suggestions"].as_array().unwrap().is_empty());
    assert!(json.get("degraded_reason").is_none());
    assert!(json["analyzed_at"].is_string());
}
