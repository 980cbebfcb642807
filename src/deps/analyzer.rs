//! Heuristic dependency hints from task text and assignments.
//!
//! Three independent heuristics run over the other tasks in the repository:
//! keyword proximity, shared file references, and shared assignees. Their
//! results are concatenated without cross-heuristic merging.

use super::repository::TaskRepository;
use crate::error::DependencyError;
use crate::types::Task;
use anyhow::Result;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default window (in characters) within which a title counts as "near" a keyword.
pub const DEFAULT_PROXIMITY_WINDOW: usize = 100;

/// Keyword table with base confidence per keyword.
pub const DEPENDENCY_KEYWORDS: [(&str, f64); 18] = [
    ("depends on", 1.0),
    ("blocked by", 1.0),
    ("blocks", 1.0),
    ("after", 1.0),
    ("requires", 0.9),
    ("prerequisite", 0.9),
    ("needs", 0.8),
    ("waits for", 0.8),
    ("builds on", 0.8),
    ("based on", 0.8),
    ("follows", 0.7),
    ("extends", 0.7),
    ("integrates with", 0.7),
    ("continues", 0.7),
    ("implements", 0.6),
    ("uses", 0.6),
    ("validates", 0.6),
    ("tests", 0.5),
];

const FILE_PATTERNS: [&str; 5] = [
    r"[\w./-]+\.(?:rs|py|js|ts|tsx|jsx|go|java|rb|sql|json|ya?ml|toml|md|html|css)\b",
    r"\bsrc/[\w./-]+",
    r"\btests?/[\w./-]+",
    r"\blib/[\w./-]+",
    r"\b(?:config|docs)/[\w./-]+",
];

const KEYWORD_CONFIDENCE_CAP: f64 = 0.95;
const FILE_CONFIDENCE_CAP: f64 = 0.8;
const FILE_CONFIDENCE_PER_MATCH: f64 = 0.2;
const AGENT_CONFIDENCE_CAP: f64 = 0.7;
const AGENT_CONFIDENCE_PER_MATCH: f64 = 0.3;
const TEMPORAL_BOOST: f64 = 0.1;
const TEMPORAL_CONFIDENCE_CAP: f64 = 0.8;

/// Which heuristic produced a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    Content,
    Pattern,
    Semantic,
    Resource,
    Temporal,
}

/// An unconfirmed candidate dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyHint {
    pub task_id: String,
    pub suggested_dependency_id: String,
    pub confidence_score: f64,
    pub suggestion_reason: String,
    pub suggestion_type: SuggestionType,
    pub evidence: BTreeMap<String, Value>,
}

impl DependencyHint {
    /// Fails unless `0.0 <= confidence_score <= 1.0`.
    pub fn new(
        task_id: impl Into<String>,
        suggested_dependency_id: impl Into<String>,
        confidence_score: f64,
        suggestion_reason: impl Into<String>,
        suggestion_type: SuggestionType,
    ) -> Result<Self, DependencyError> {
        if !(0.0..=1.0).contains(&confidence_score) {
            return Err(DependencyError::InvalidConfidence(confidence_score));
        }
        Ok(Self {
            task_id: task_id.into(),
            suggested_dependency_id: suggested_dependency_id.into(),
            confidence_score,
            suggestion_reason: suggestion_reason.into(),
            suggestion_type,
            evidence: BTreeMap::new(),
        })
    }

    pub fn with_evidence(mut self, key: impl Into<String>, value: Value) -> Self {
        self.evidence.insert(key.into(), value);
        self
    }
}

pub struct ContentAnalyzer {
    repo: Arc<dyn TaskRepository>,
    keywords: Vec<(&'static str, f64, Regex)>,
    file_patterns: Vec<Regex>,
    proximity_window: usize,
}

impl ContentAnalyzer {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        let keywords = DEPENDENCY_KEYWORDS
            .iter()
            .filter_map(|&(keyword, base)| {
                let pattern = format!(r"\b{}\b", regex_lite::escape(keyword));
                Regex::new(&pattern).ok().map(|re| (keyword, base, re))
            })
            .collect();
        let file_patterns = FILE_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();

        Self {
            repo,
            keywords,
            file_patterns,
            proximity_window: DEFAULT_PROXIMITY_WINDOW,
        }
    }

    pub fn with_proximity_window(mut self, window: usize) -> Self {
        self.proximity_window = window.max(1);
        self
    }

    /// Same heuristics over a different repository (e.g. a user-scoped view).
    pub fn with_repository(&self, repo: Arc<dyn TaskRepository>) -> Self {
        Self {
            repo,
            keywords: self.keywords.clone(),
            file_patterns: self.file_patterns.clone(),
            proximity_window: self.proximity_window,
        }
    }

    /// Run every heuristic against all other tasks. Never fails: a failing
    /// heuristic contributes no hints.
    pub fn analyze_task_content(&self, task: &Task) -> Vec<DependencyHint> {
        let others: Vec<Task> = match self.repo.find_all() {
            Ok(all) => all.into_iter().filter(|t| t.id != task.id).collect(),
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Content analysis could not load tasks");
                return Vec::new();
            }
        };

        let mut hints = Vec::new();
        hints.extend(absorb("keyword", self.keyword_hints(task, &others)));
        hints.extend(absorb("file_reference", self.file_reference_hints(task, &others)));
        hints.extend(absorb("agent_overlap", agent_overlap_hints(task, &others)));

        debug!(task_id = %task.id, hints = hints.len(), "Content analysis complete");
        hints
    }

    fn keyword_hints(&self, task: &Task, others: &[Task]) -> Result<Vec<DependencyHint>> {
        let text = task.full_text().to_lowercase();
        let window = self.proximity_window;
        let mut hints = Vec::new();

        for (keyword, base, re) in &self.keywords {
            let spans: Vec<(usize, usize)> = re
                .find_iter(&text)
                .map(|m| (char_offset(&text, m.start()), char_offset(&text, m.end())))
                .collect();
            if spans.is_empty() {
                continue;
            }

            for other in others {
                let title = other.title.trim().to_lowercase();
                if title.is_empty() {
                    continue;
                }

                let closest = text
                    .match_indices(title.as_str())
                    .flat_map(|(start, _)| {
                        let start = char_offset(&text, start);
                        let end = start + title.chars().count();
                        spans.iter().map(move |&kw| span_distance(kw, (start, end)))
                    })
                    .min();

                let Some(distance) = closest.filter(|d| *d <= window) else {
                    continue;
                };

                let proximity = (1.0 - distance as f64 / window as f64).max(0.5);
                let confidence = (base * proximity).min(KEYWORD_CONFIDENCE_CAP);
                hints.push(
                    DependencyHint::new(
                        &task.id,
                        &other.id,
                        confidence,
                        format!("'{}' appears near a reference to '{}'", keyword, other.title),
                        SuggestionType::Content,
                    )?
                    .with_evidence("keyword", json!(keyword))
                    .with_evidence("distance", json!(distance))
                    .with_evidence("base_score", json!(base)),
                );
            }
        }

        Ok(hints)
    }

    /// File-path-like references found in a task's text.
    pub fn extract_file_references(&self, task: &Task) -> BTreeSet<String> {
        let text = task.full_text();
        self.file_patterns
            .iter()
            .flat_map(|re| re.find_iter(&text).map(|m| m.as_str().trim_end_matches('.').to_string()))
            .filter(|r| !r.is_empty())
            .collect()
    }

    fn file_reference_hints(&self, task: &Task, others: &[Task]) -> Result<Vec<DependencyHint>> {
        let files = self.extract_file_references(task);
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mut hints = Vec::new();
        for other in others {
            let shared: Vec<String> = self
                .extract_file_references(other)
                .intersection(&files)
                .cloned()
                .collect();
            if shared.is_empty() {
                continue;
            }

            let confidence = (FILE_CONFIDENCE_PER_MATCH * shared.len() as f64).min(FILE_CONFIDENCE_CAP);
            hints.push(
                DependencyHint::new(
                    &task.id,
                    &other.id,
                    confidence,
                    format!("Both tasks reference {}", shared.join(", ")),
                    SuggestionType::Pattern,
                )?
                .with_evidence("shared_files", json!(shared)),
            );
        }

        Ok(hints)
    }
}

fn agent_overlap_hints(task: &Task, others: &[Task]) -> Result<Vec<DependencyHint>> {
    let agents: HashSet<&str> = task.assignees.iter().map(String::as_str).collect();
    if agents.is_empty() {
        return Ok(Vec::new());
    }

    let mut hints = Vec::new();
    for other in others {
        let shared: BTreeSet<&str> = other
            .assignees
            .iter()
            .map(String::as_str)
            .filter(|a| agents.contains(a))
            .collect();
        if shared.is_empty() {
            continue;
        }

        let mut confidence =
            (AGENT_CONFIDENCE_PER_MATCH * shared.len() as f64).min(AGENT_CONFIDENCE_CAP);
        let created_earlier = other.created_at < task.created_at;
        if created_earlier {
            confidence = (confidence + TEMPORAL_BOOST).min(TEMPORAL_CONFIDENCE_CAP);
        }

        let names: Vec<&str> = shared.into_iter().collect();
        hints.push(
            DependencyHint::new(
                &task.id,
                &other.id,
                confidence,
                format!("Shares assignees: {}", names.join(", ")),
                SuggestionType::Resource,
            )?
            .with_evidence("shared_agents", json!(names))
            .with_evidence("created_earlier", json!(created_earlier)),
        );
    }

    Ok(hints)
}

/// Characters between two spans; zero when they overlap.
/// Character position of a byte offset that lies on a char boundary.
fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// Gap in characters between two half-open spans, zero when they overlap.
fn span_distance(a: (usize, usize), b: (usize, usize)) -> usize {
    if b.0 >= a.1 {
        b.0 - a.1
    } else if a.0 >= b.1 {
        a.0 - b.1
    } else {
        0
    }
}

fn absorb(heuristic: &str, result: Result<Vec<DependencyHint>>) -> Vec<DependencyHint> {
    result.unwrap_or_else(|e| {
        warn!(heuristic = %heuristic, error = %e, "Dependency heuristic failed");
        Vec::new()
    })
}
