//! Output formatting utilities for markdown and JSON.

use crate::deps::{DependencyChain, DependencyInfo, DependencyRelationships, DependencySuggestion};
use crate::types::{Task, TaskStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output format for tool and CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

/// Format a single task as markdown.
pub fn format_task_markdown(task: &Task) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Task: {}\n", task.title));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!("- **status**: {}\n", task.status));
    md.push_str(&format!("- **priority**: {}\n", task.priority));
    md.push_str(&format!("- **progress**: {}%\n", task.overall_progress));

    if !task.assignees.is_empty() {
        md.push_str(&format!("- **assignees**: {}\n", task.assignees.join(", ")));
    }

    if let Some(ref effort) = task.estimated_effort {
        md.push_str(&format!("- **effort**: {}\n", effort));
    }

    if !task.dependencies.is_empty() {
        let deps: Vec<String> = task.dependencies.iter().map(|id| format!("`{}`", id)).collect();
        md.push_str(&format!("- **depends_on**: {}\n", deps.join(", ")));
    }

    if let Some(ref desc) = task.description {
        md.push_str("\n### Description\n");
        md.push_str(desc);
        md.push('\n');
    }

    md
}

fn status_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Done => "[x]",
        TaskStatus::Blocked => "[!]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Cancelled | TaskStatus::Archived => "[-]",
        _ => "[ ]",
    }
}

fn info_line(info: &DependencyInfo) -> String {
    let mut line = format!(
        "- {} **{}** `{}` ({}, {}%)",
        status_marker(info.status),
        info.title,
        info.task_id,
        info.status,
        info.completion_percentage
    );
    if info.is_blocked {
        line.push_str(" - waiting on its own dependencies");
    }
    line.push('\n');
    line
}

fn chain_section(md: &mut String, heading: &str, chains: &[DependencyChain]) {
    if chains.is_empty() {
        return;
    }
    md.push_str(&format!("\n### {}\n", heading));
    for chain in chains {
        md.push_str(&format!(
            "- `{}`: {} ({}/{} done",
            chain.chain_id,
            chain.chain_status.as_str(),
            chain.completed_tasks,
            chain.total_tasks
        ));
        if chain.blocked_tasks > 0 {
            md.push_str(&format!(", {} blocked", chain.blocked_tasks));
        }
        md.push_str(")\n");
    }
}

/// Format a dependency report as markdown.
pub fn format_relationships_markdown(rel: &DependencyRelationships) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Dependencies: `{}`\n", rel.task_id));
    md.push_str(&format!("{}\n\n", rel.dependency_summary));
    md.push_str(&format!(
        "- **can_start**: {}\n- **blocked**: {}\n",
        rel.can_start, rel.is_blocked
    ));

    if !rel.depends_on.is_empty() {
        md.push_str("\n### Depends on\n");
        for info in &rel.depends_on {
            md.push_str(&info_line(info));
        }
    }

    if !rel.blocks.is_empty() {
        md.push_str("\n### Blocks\n");
        for info in &rel.blocks {
            md.push_str(&info_line(info));
        }
    }

    chain_section(&mut md, "Upstream chains", &rel.upstream_chains);
    chain_section(&mut md, "Downstream chains", &rel.downstream_chains);

    if !rel.blocking_reasons.is_empty() {
        md.push_str("\n### Waiting on\n");
        for reason in &rel.blocking_reasons {
            md.push_str(&format!("- {}\n", reason));
        }
    }

    if !rel.next_actions.is_empty() {
        md.push_str("\n### Next actions\n");
        for action in &rel.next_actions {
            md.push_str(&format!("- {}\n", action));
        }
    }

    md
}

/// Format ranked suggestions as markdown.
pub fn format_suggestions_markdown(task_id: &str, suggestions: &[DependencySuggestion]) -> String {
    let mut md = format!("## Suggested dependencies: `{}`\n", task_id);
    if suggestions.is_empty() {
        md.push_str("No additional dependencies suggested\n");
        return md;
    }

    for s in suggestions {
        let title = s
            .target_task_info
            .as_ref()
            .map(|info| info.title.as_str())
            .unwrap_or("unknown task");
        md.push_str(&format!(
            "- `{}` {} ({:.2}, {:?}): {}\n",
            s.hint.suggested_dependency_id,
            title,
            s.confidence_score(),
            s.hint.suggestion_type,
            s.hint.suggestion_reason
        ));
    }
    md
}

/// Convert markdown to JSON value for uniform response handling.
pub fn markdown_to_json(md: String) -> Value {
    serde_json::json!({
        "format": "markdown",
        "content": md
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("md"), Some(OutputFormat::Markdown));
        assert_eq!(OutputFormat::from_str("yaml"), None);
    }

    #[test]
    fn unresolved_report_lists_manual_review() {
        let md = format_relationships_markdown(&DependencyRelationships::unresolved("t9"));
        assert!(md.contains("`t9`"));
        assert!(md.contains("Unable to resolve dependencies"));
        assert!(md.contains("- Review task dependencies manually"));
        assert!(!md.contains("### Depends on"));
    }

    #[test]
    fn empty_suggestions_render_placeholder() {
        let md = format_suggestions_markdown("t1", &[]);
        assert!(md.contains("No additional dependencies suggested"));
    }
}
