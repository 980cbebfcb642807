//! Composition of authoritative resolution with heuristic suggestions.

use super::analyzer::{ContentAnalyzer, DependencyHint};
use super::model::{DependencyInfo, DependencyRelationships, Resolution};
use super::repository::TaskRepository;
use super::resolver::DependencyResolver;
use crate::error::DependencyError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default number of suggestions returned by `suggest_dependencies`.
pub const DEFAULT_MAX_SUGGESTIONS: usize = 10;

/// Suggestions above this confidence count as high confidence.
pub const DEFAULT_HIGH_CONFIDENCE: f64 = 0.7;

/// Review state of a suggestion. The engine only ever creates `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    AutoApplied,
}

/// A hint enriched with details of the suggested task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencySuggestion {
    #[serde(flatten)]
    pub hint: DependencyHint,
    /// Absent when the suggested task could not be loaded.
    pub target_task_info: Option<DependencyInfo>,
    pub status: SuggestionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DependencySuggestion {
    pub fn new(hint: DependencyHint, target_task_info: Option<DependencyInfo>) -> Self {
        let now = Utc::now();
        Self {
            hint,
            target_task_info,
            status: SuggestionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn confidence_score(&self) -> f64 {
        self.hint.confidence_score
    }
}

/// Resolved relationships plus ranked suggestions.
#[derive(Debug, Clone, Serialize)]
pub struct EnhancedDependencyRelationships {
    #[serde(flatten)]
    pub relationships: DependencyRelationships,
    /// Set when the relationships are the safe default or suggestions were skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
    pub ai_suggestions: Vec<DependencySuggestion>,
    pub suggestion_summary: String,
    pub high_confidence_suggestions: usize,
    pub optimization_score: f64,
    pub analyzed_at: DateTime<Utc>,
}

/// Counters exposed for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Seconds spent in the last `resolve_dependencies_with_ai` call.
    pub analysis_time: f64,
    pub suggestions_generated: u64,
    /// Acceptance happens outside the engine; never incremented here.
    pub suggestions_accepted: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

pub struct DependencyManagementEngine {
    resolver: DependencyResolver,
    analyzer: ContentAnalyzer,
    metrics: Arc<Mutex<PerformanceMetrics>>,
    max_suggestions: usize,
    high_confidence: f64,
}

impl DependencyManagementEngine {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self::from_parts(
            DependencyResolver::new(Arc::clone(&repo)),
            ContentAnalyzer::new(repo),
        )
    }

    pub fn from_parts(resolver: DependencyResolver, analyzer: ContentAnalyzer) -> Self {
        Self {
            resolver,
            analyzer,
            metrics: Arc::new(Mutex::new(PerformanceMetrics::default())),
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            high_confidence: DEFAULT_HIGH_CONFIDENCE,
        }
    }

    pub fn with_max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }

    pub fn with_high_confidence_threshold(mut self, threshold: f64) -> Self {
        self.high_confidence = threshold;
        self
    }

    /// An engine over the repository's view of one user's tasks. Metrics are
    /// shared with `self`.
    pub fn with_user(&self, user_id: &str) -> Self {
        let resolver = self.resolver.with_user(user_id);
        let analyzer = self
            .analyzer
            .with_repository(Arc::clone(resolver.repository()));
        Self {
            resolver,
            analyzer,
            metrics: Arc::clone(&self.metrics),
            max_suggestions: self.max_suggestions,
            high_confidence: self.high_confidence,
        }
    }

    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    /// Resolve relationships and attach ranked suggestions. Never fails:
    /// if anything goes wrong the authoritative data is returned alone.
    pub async fn resolve_dependencies_with_ai(
        &self,
        task_id: &str,
    ) -> EnhancedDependencyRelationships {
        let start = Instant::now();

        let enhanced = match self.enhance(task_id) {
            Ok(enhanced) => enhanced,
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Suggestion analysis failed, returning resolution only");
                self.fallback(task_id, &e)
            }
        };

        let elapsed = start.elapsed().as_secs_f64();
        self.update_metrics(|m| m.analysis_time = elapsed);
        info!(
            task_id = %task_id,
            suggestions = enhanced.ai_suggestions.len(),
            duration_ms = (elapsed * 1000.0) as u64,
            "Dependency analysis complete"
        );
        enhanced
    }

    fn enhance(&self, task_id: &str) -> Result<EnhancedDependencyRelationships, DependencyError> {
        let resolution = self.resolver.resolve_dependencies(task_id)?;
        let suggestions = self.suggest_dependencies(task_id)?;

        let high: Vec<f64> = suggestions
            .iter()
            .map(DependencySuggestion::confidence_score)
            .filter(|c| *c > self.high_confidence)
            .collect();
        let existing = resolution.relationships().total_dependencies;

        let suggestion_summary = if suggestions.is_empty() {
            "No additional dependencies suggested".to_string()
        } else {
            format!(
                "{} dependency suggestions ({} high confidence)",
                suggestions.len(),
                high.len()
            )
        };

        let degraded_reason = resolution.degraded_reason().map(str::to_string);
        Ok(EnhancedDependencyRelationships {
            relationships: resolution.into_relationships(),
            degraded_reason,
            high_confidence_suggestions: high.len(),
            optimization_score: optimization_score(&high, existing),
            ai_suggestions: suggestions,
            suggestion_summary,
            analyzed_at: Utc::now(),
        })
    }

    fn fallback(&self, task_id: &str, cause: &DependencyError) -> EnhancedDependencyRelationships {
        let resolution = match self.resolver.resolve_dependencies(task_id) {
            Ok(resolution) => resolution,
            Err(e) => Resolution::Degraded {
                relationships: DependencyRelationships::unresolved(task_id),
                reason: e.to_string(),
            },
        };

        let reason = match resolution.degraded_reason() {
            Some(reason) => reason.to_string(),
            None => cause.to_string(),
        };

        EnhancedDependencyRelationships {
            relationships: resolution.into_relationships(),
            degraded_reason: Some(reason),
            ai_suggestions: Vec::new(),
            suggestion_summary: format!("AI suggestions unavailable: {}", cause),
            high_confidence_suggestions: 0,
            optimization_score: 0.0,
            analyzed_at: Utc::now(),
        }
    }

    /// Ranked suggestions for `task_id`, highest confidence first.
    ///
    /// Hints naming the same target are merged, keeping the most confident.
    pub fn suggest_dependencies(
        &self,
        task_id: &str,
    ) -> Result<Vec<DependencySuggestion>, DependencyError> {
        let repo = self.resolver.repository();
        let task = repo
            .find_by_id(task_id)?
            .ok_or_else(|| DependencyError::TaskNotFound(task_id.to_string()))?;

        let mut best: HashMap<String, DependencyHint> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for hint in self.analyzer.analyze_task_content(&task) {
            match best.get_mut(&hint.suggested_dependency_id) {
                Some(existing) => {
                    if hint.confidence_score > existing.confidence_score {
                        *existing = hint;
                    }
                }
                None => {
                    order.push(hint.suggested_dependency_id.clone());
                    best.insert(hint.suggested_dependency_id.clone(), hint);
                }
            }
        }

        let mut suggestions = Vec::with_capacity(order.len());
        for target_id in order {
            let Some(hint) = best.remove(&target_id) else {
                continue;
            };
            let target_info = match repo.find_by_id(&target_id) {
                Ok(Some(target)) => match self.resolver.dependency_info(&target, false) {
                    Ok(info) => Some(info),
                    Err(e) => {
                        warn!(task_id = %task_id, target = %target_id, error = %e, "Could not describe suggested task");
                        None
                    }
                },
                Ok(None) => {
                    warn!(task_id = %task_id, target = %target_id, "Suggested task not found, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(task_id = %task_id, target = %target_id, error = %e, "Could not load suggested task");
                    None
                }
            };
            suggestions.push(DependencySuggestion::new(hint, target_info));
        }

        suggestions.sort_by(|a, b| b.confidence_score().total_cmp(&a.confidence_score()));
        suggestions.truncate(self.max_suggestions);

        let generated = suggestions.len() as u64;
        self.update_metrics(|m| m.suggestions_generated += generated);
        debug!(task_id = %task_id, suggestions = generated, "Generated dependency suggestions");

        Ok(suggestions)
    }

    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset_performance_metrics(&self) {
        self.update_metrics(|m| *m = PerformanceMetrics::default());
    }

    fn update_metrics(&self, f: impl FnOnce(&mut PerformanceMetrics)) {
        let mut metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut metrics);
    }
}

/// Weighted blend of high-confidence quality and coverage, in 0..=1.
///
/// `high` holds the confidence of each high-confidence suggestion;
/// `existing` is the number of confirmed dependencies.
pub fn optimization_score(high: &[f64], existing: usize) -> f64 {
    if high.is_empty() {
        return 0.0;
    }
    let mean = high.iter().sum::<f64>() / high.len() as f64;
    let coverage = if existing == 0 {
        1.0
    } else {
        (high.len() as f64 / existing as f64).min(1.0)
    };
    0.6 * mean + 0.4 * coverage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::analyzer::SuggestionType;

    #[test]
    fn optimization_score_blends_quality_and_coverage() {
        assert_eq!(optimization_score(&[], 3), 0.0);
        let score = optimization_score(&[0.8, 0.9], 4);
        assert!((score - (0.6 * 0.85 + 0.4 * 0.5)).abs() < 1e-9);
        let capped = optimization_score(&[0.8, 0.8, 0.8], 1);
        assert!((capped - (0.6 * 0.8 + 0.4)).abs() < 1e-9);
        let no_existing = optimization_score(&[0.9], 0);
        assert!((no_existing - (0.6 * 0.9 + 0.4)).abs() < 1e-9);
    }

    #[test]
    fn suggestion_starts_pending() {
        let hint = DependencyHint::new("a", "b", 0.5, "r", SuggestionType::Resource)
            .unwrap();
        let suggestion = DependencySuggestion::new(hint, None);
        assert_eq!(suggestion.status, SuggestionStatus::Pending);
        assert_eq!(suggestion.created_at, suggestion.updated_at);
        let json = serde_json::to_value(&suggestion).unwrap();
        assert_eq!(json["suggested_dependency_id"], "b");
        assert_eq!(json["status"], "pending");
        assert!(json["target_task_info"].is_null());
    }
}
