//! Structured error types for the engine and for tool responses.

use serde::Serialize;
use std::fmt;

/// Failures that cross the dependency engine's boundary.
///
/// Only a missing seed task is a hard failure for resolution; everything
/// else degrades (see [`crate::deps::Resolution`]).
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Confidence score {0} is outside 0.0..=1.0")]
    InvalidConfidence(f64),

    #[error("Repository error: {0}")]
    Repository(#[from] anyhow::Error),
}

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,

    // Not found errors
    TaskNotFound,

    // Conflict errors
    AlreadyExists,
    DependencyCycle,

    // Internal errors
    DatabaseError,
    InternalError,
    UnknownTool,
}

/// Structured error for tool responses.
#[derive(Debug, Serialize)]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn already_exists(task_id: &str) -> Self {
        Self::new(
            ErrorCode::AlreadyExists,
            format!("Task already exists: {}", task_id),
        )
    }

    pub fn dependency_cycle(task_id: &str, depends_on: &str) -> Self {
        Self::new(
            ErrorCode::DependencyCycle,
            format!(
                "Making {} depend on {} would create a cycle",
                task_id, depends_on
            ),
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ErrorCode::UnknownTool, format!("Unknown tool: {}", name))
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ToolError {}

impl From<DependencyError> for ToolError {
    fn from(err: DependencyError) -> Self {
        match err {
            DependencyError::TaskNotFound(id) => ToolError::task_not_found(&id),
            DependencyError::InvalidConfidence(score) => {
                ToolError::internal(format!("Invalid confidence score: {}", score))
            }
            DependencyError::Repository(e) => ToolError::database(e),
        }
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ToolError>() {
            Ok(tool_err) => tool_err,
            Err(err) => match err.downcast::<DependencyError>() {
                Ok(dep_err) => dep_err.into(),
                Err(err) => ToolError::internal(err),
            },
        }
    }
}

/// Result type for tool operations.
pub type ToolResult<T> = std::result::Result<T, ToolError>;
