//! Value objects produced by the dependency engine.

use crate::types::{Task, TaskPriority, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary shown when resolution had to fall back to defaults.
pub const UNRESOLVED_SUMMARY: &str = "Unable to resolve dependencies";

/// Snapshot of one related task as seen from another task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyInfo {
    pub task_id: String,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub completion_percentage: i32,
    /// The seed task's completion is required by this task (it sits in `blocks`).
    pub is_blocking: bool,
    /// This task has dependencies of its own that are not done or cancelled.
    pub is_blocked: bool,
    pub estimated_effort: Option<String>,
    pub assignees: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl DependencyInfo {
    pub fn from_task(task: &Task, is_blocking: bool, is_blocked: bool) -> Self {
        Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            status: task.status,
            priority: task.priority,
            completion_percentage: task.overall_progress.clamp(0, 100),
            is_blocking,
            is_blocked,
            estimated_effort: task.estimated_effort.clone(),
            assignees: task.assignees.clone(),
            updated_at: DateTime::from_timestamp_millis(task.updated_at).unwrap_or_default(),
        }
    }
}

/// Aggregate state of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    Completed,
    Blocked,
    InProgress,
    NotStarted,
}

impl ChainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainStatus::Completed => "completed",
            ChainStatus::Blocked => "blocked",
            ChainStatus::InProgress => "in_progress",
            ChainStatus::NotStarted => "not_started",
        }
    }
}

/// Tasks reached by one traversal, in breadth-first order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyChain {
    pub chain_id: String,
    pub tasks: Vec<DependencyInfo>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub blocked_tasks: usize,
    pub chain_status: ChainStatus,
}

impl DependencyChain {
    /// Build a chain; counts and status are derived from `tasks`. An empty
    /// chain is `NotStarted`.
    pub fn new(chain_id: impl Into<String>, tasks: Vec<DependencyInfo>) -> Self {
        let total_tasks = tasks.len();
        let completed_tasks = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Done)
            .count();
        let blocked_tasks = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Blocked)
            .count();

        let chain_status = if total_tasks > 0 && completed_tasks == total_tasks {
            ChainStatus::Completed
        } else if blocked_tasks > 0 {
            ChainStatus::Blocked
        } else if tasks.iter().any(|t| t.status == TaskStatus::InProgress) {
            ChainStatus::InProgress
        } else {
            ChainStatus::NotStarted
        };

        Self {
            chain_id: chain_id.into(),
            tasks,
            total_tasks,
            completed_tasks,
            blocked_tasks,
            chain_status,
        }
    }
}

/// Full dependency view of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRelationships {
    pub task_id: String,
    pub depends_on: Vec<DependencyInfo>,
    pub blocks: Vec<DependencyInfo>,
    pub upstream_chains: Vec<DependencyChain>,
    pub downstream_chains: Vec<DependencyChain>,
    pub total_dependencies: usize,
    pub completed_dependencies: usize,
    pub blocked_dependencies: usize,
    pub can_start: bool,
    pub is_blocked: bool,
    pub is_blocking_others: bool,
    pub dependency_summary: String,
    pub next_actions: Vec<String>,
    pub blocking_reasons: Vec<String>,
}

impl DependencyRelationships {
    /// Well-formed, empty relationships used when resolution fails after
    /// the seed task was found.
    pub fn unresolved(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            depends_on: Vec::new(),
            blocks: Vec::new(),
            upstream_chains: Vec::new(),
            downstream_chains: Vec::new(),
            total_dependencies: 0,
            completed_dependencies: 0,
            blocked_dependencies: 0,
            can_start: true,
            is_blocked: false,
            is_blocking_others: false,
            dependency_summary: UNRESOLVED_SUMMARY.to_string(),
            next_actions: vec!["Review task dependencies manually".to_string()],
            blocking_reasons: Vec::new(),
        }
    }
}

/// Outcome of a resolution whose seed task exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum Resolution {
    Resolved(DependencyRelationships),
    Degraded {
        relationships: DependencyRelationships,
        reason: String,
    },
}

impl Resolution {
    pub fn relationships(&self) -> &DependencyRelationships {
        match self {
            Resolution::Resolved(rel) => rel,
            Resolution::Degraded { relationships, .. } => relationships,
        }
    }

    pub fn into_relationships(self) -> DependencyRelationships {
        match self {
            Resolution::Resolved(rel) => rel,
            Resolution::Degraded { relationships, .. } => relationships,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Resolution::Degraded { .. })
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(_) => None,
            Resolution::Degraded { reason, .. } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str, status: TaskStatus) -> DependencyInfo {
        DependencyInfo {
            task_id: id.to_string(),
            title: format!("Task {}", id),
            status,
            priority: TaskPriority::Medium,
            completion_percentage: 0,
            is_blocking: false,
            is_blocked: false,
            estimated_effort: None,
            assignees: vec![],
            updated_at: DateTime::default(),
        }
    }

    #[test]
    fn chain_completed_when_all_done() {
        let chain = DependencyChain::new(
            "upstream_a",
            vec![info("a", TaskStatus::Done), info("b", TaskStatus::Done)],
        );
        assert_eq!(chain.total_tasks, 2);
        assert_eq!(chain.completed_tasks, 2);
        assert_eq!(chain.chain_status, ChainStatus::Completed);
    }

    #[test]
    fn chain_blocked_wins_over_in_progress() {
        let chain = DependencyChain::new(
            "upstream_a",
            vec![
                info("a", TaskStatus::InProgress),
                info("b", TaskStatus::Blocked),
                info("c", TaskStatus::Done),
            ],
        );
        assert_eq!(chain.blocked_tasks, 1);
        assert_eq!(chain.chain_status, ChainStatus::Blocked);
    }

    #[test]
    fn chain_in_progress_and_not_started() {
        let running = DependencyChain::new(
            "c1",
            vec![info("a", TaskStatus::Todo), info("b", TaskStatus::InProgress)],
        );
        assert_eq!(running.chain_status, ChainStatus::InProgress);

        let idle = DependencyChain::new(
            "c2",
            vec![info("a", TaskStatus::Todo), info("b", TaskStatus::Review)],
        );
        assert_eq!(idle.chain_status, ChainStatus::NotStarted);
    }

    #[test]
    fn empty_chain_is_not_completed() {
        let chain = DependencyChain::new("upstream_none", vec![]);
        assert_eq!(chain.total_tasks, 0);
        assert_eq!(chain.chain_status, ChainStatus::NotStarted);
    }

    #[test]
    fn unresolved_defaults_are_permissive() {
        let rel = DependencyRelationships::unresolved("t1");
        assert!(rel.can_start);
        assert!(!rel.is_blocked);
        assert!(rel.depends_on.is_empty());
        assert_eq!(rel.dependency_summary, UNRESOLVED_SUMMARY);
        assert_eq!(rel.next_actions.len(), 1);
    }

    #[test]
    fn resolution_serializes_with_tag() {
        let res = Resolution::Degraded {
            relationships: DependencyRelationships::unresolved("t1"),
            reason: "boom".into(),
        };
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["resolution"], "degraded");
        assert_eq!(json["reason"], "boom");
        assert_eq!(json["relationships"]["task_id"], "t1");
        assert_eq!(res.degraded_reason(), Some("boom"));
    }

    #[test]
    fn info_renders_updated_at_as_rfc3339() {
        let mut task_info = info("a", TaskStatus::Todo);
        task_info.updated_at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let json = serde_json::to_value(&task_info).unwrap();
        assert_eq!(json["updated_at"], "2023-11-14T22:13:20Z");
        assert_eq!(json["status"], "todo");
    }
}
