//! Core types for the task dependency server.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Blocked,
    Review,
    Testing,
    Done,
    Cancelled,
    Archived,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 8] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Review,
        TaskStatus::Testing,
        TaskStatus::Done,
        TaskStatus::Cancelled,
        TaskStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Review => "review",
            TaskStatus::Testing => "testing",
            TaskStatus::Done => "done",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "todo" => Some(TaskStatus::Todo),
            "in_progress" => Some(TaskStatus::InProgress),
            "blocked" => Some(TaskStatus::Blocked),
            "review" => Some(TaskStatus::Review),
            "testing" => Some(TaskStatus::Testing),
            "done" => Some(TaskStatus::Done),
            "cancelled" => Some(TaskStatus::Cancelled),
            "archived" => Some(TaskStatus::Archived),
            _ => None,
        }
    }

    /// Whether a dependency in this state no longer holds anything up.
    pub fn is_settled(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
            TaskPriority::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            "urgent" => Some(TaskPriority::Urgent),
            "critical" => Some(TaskPriority::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task as seen by the dependency engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub details: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Progress indicator, 0-100.
    pub overall_progress: i32,
    pub estimated_effort: Option<String>,
    pub assignees: Vec<String>,
    /// Ids of the tasks this task depends on, in insertion order.
    pub dependencies: Vec<String>,
    /// Owning user for multi-tenant stores.
    pub user_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    pub fn dependency_ids(&self) -> &[String] {
        &self.dependencies
    }

    /// Title, description and details joined with spaces.
    pub fn full_text(&self) -> String {
        let mut text = self.title.clone();
        for part in [&self.description, &self.details].into_iter().flatten() {
            text.push(' ');
            text.push_str(part);
        }
        text
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    /// Custom task ID (optional, UUID7 generated if not provided)
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub details: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub overall_progress: Option<i32>,
    pub estimated_effort: Option<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub user_id: Option<String>,
}

/// Partial update of a task. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub overall_progress: Option<i32>,
    pub estimated_effort: Option<String>,
    pub assignees: Option<Vec<String>>,
}

/// Filters for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<Vec<TaskStatus>>,
    pub assignee: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_string_roundtrip() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::from_str("IN_PROGRESS"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::from_str("nope"), None);
    }

    #[test]
    fn settled_states() {
        assert!(TaskStatus::Done.is_settled());
        assert!(TaskStatus::Cancelled.is_settled());
        assert!(!TaskStatus::Blocked.is_settled());
        assert!(!TaskStatus::Review.is_settled());
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!(TaskPriority::from_str("Urgent"), Some(TaskPriority::Urgent));
        assert!(TaskPriority::High > TaskPriority::Medium);
    }

    #[test]
    fn full_text_skips_missing_fields() {
        let task = Task {
            id: "t".into(),
            title: "Build API".into(),
            description: None,
            details: Some("uses src/api.rs".into()),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            overall_progress: 0,
            estimated_effort: None,
            assignees: vec![],
            dependencies: vec![],
            user_id: None,
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(task.full_text(), "Build API uses src/api.rs");
    }
}
