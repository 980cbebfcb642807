//! Authoritative dependency resolution for a single task.
//!
//! The resolver walks the dependency graph reachable from a seed task and
//! turns it into a [`DependencyRelationships`] view. Only a missing seed is an
//! error; every later failure degrades to [`DependencyRelationships::unresolved`]
//! so that dependency data never blocks primary task operations.

use super::model::{DependencyChain, DependencyInfo, DependencyRelationships, Resolution};
use super::repository::TaskRepository;
use crate::error::DependencyError;
use crate::types::{Task, TaskStatus};
use anyhow::Result;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default cap on graph traversal depth.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Adjacency map: task id -> ids it depends on.
pub type DependencyGraph = HashMap<String, Vec<String>>;

#[derive(Clone)]
pub struct DependencyResolver {
    repo: Arc<dyn TaskRepository>,
    max_depth: usize,
}

impl DependencyResolver {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self {
            repo,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// A resolver over the repository's view of one user's tasks.
    /// Falls back to the same repository when it cannot scope by user.
    pub fn with_user(&self, user_id: &str) -> Self {
        match self.repo.scoped_to_user(user_id) {
            Some(repo) => Self {
                repo,
                max_depth: self.max_depth,
            },
            None => self.clone(),
        }
    }

    pub fn repository(&self) -> &Arc<dyn TaskRepository> {
        &self.repo
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolve the full dependency view of `task_id`.
    pub fn resolve_dependencies(&self, task_id: &str) -> Result<Resolution, DependencyError> {
        let seed = match self.repo.find_by_id(task_id) {
            Ok(Some(task)) => task,
            Ok(None) => return Err(DependencyError::TaskNotFound(task_id.to_string())),
            Err(e) => return Ok(self.degraded(task_id, e)),
        };

        match self.build_relationships(&seed) {
            Ok(rel) => Ok(Resolution::Resolved(rel)),
            Err(e) => Ok(self.degraded(task_id, e)),
        }
    }

    fn degraded(&self, task_id: &str, err: anyhow::Error) -> Resolution {
        warn!(task_id = %task_id, error = %err, "Dependency resolution degraded");
        Resolution::Degraded {
            relationships: DependencyRelationships::unresolved(task_id),
            reason: err.to_string(),
        }
    }

    fn build_relationships(&self, seed: &Task) -> Result<DependencyRelationships> {
        let graph = self.build_dependency_graph(&seed.id);
        debug!(task_id = %seed.id, nodes = graph.len(), "Built dependency graph");

        let depends_on = self.direct_dependencies(seed)?;
        let blocks = self.blocking_tasks(seed)?;

        let upstream_chains = self.upstream_chains(&seed.id, &depends_on, &graph)?;
        let downstream_chains = blocks
            .iter()
            .map(|info| DependencyChain::new(format!("downstream_{}", info.task_id), vec![info.clone()]))
            .collect();

        let total_dependencies = depends_on.len();
        let completed_dependencies = depends_on
            .iter()
            .filter(|d| d.status == TaskStatus::Done)
            .count();
        let blocked_dependencies = depends_on
            .iter()
            .filter(|d| d.status == TaskStatus::Blocked)
            .count();
        let can_start = completed_dependencies == total_dependencies;
        let is_blocked = blocked_dependencies > 0;
        let is_blocking_others = !blocks.is_empty();

        let blocking_reasons = depends_on
            .iter()
            .filter(|d| d.status != TaskStatus::Done)
            .map(|d| format!("'{}' ({})", d.title, d.status))
            .collect();

        let dependency_summary = summarize(
            total_dependencies,
            completed_dependencies,
            blocked_dependencies,
            blocks.len(),
        );
        let next_actions = suggest_next_actions(&depends_on, blocks.len());

        Ok(DependencyRelationships {
            task_id: seed.id.clone(),
            depends_on,
            blocks,
            upstream_chains,
            downstream_chains,
            total_dependencies,
            completed_dependencies,
            blocked_dependencies,
            can_start,
            is_blocked,
            is_blocking_others,
            dependency_summary,
            next_actions,
            blocking_reasons,
        })
    }

    /// Depth-first walk from `task_id` recording each node's dependency ids.
    ///
    /// Nodes that fail to load are skipped, so the graph may be partial.
    pub fn build_dependency_graph(&self, task_id: &str) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        let mut visited = HashSet::new();
        self.visit(task_id, 0, &mut visited, &mut graph);
        graph
    }

    fn visit(
        &self,
        task_id: &str,
        depth: usize,
        visited: &mut HashSet<String>,
        graph: &mut DependencyGraph,
    ) {
        if depth > self.max_depth || !visited.insert(task_id.to_string()) {
            return;
        }

        let task = match self.repo.find_by_id(task_id) {
            Ok(Some(task)) => task,
            Ok(None) => {
                debug!(task_id = %task_id, "Dependency graph references missing task");
                return;
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Failed to load task while building dependency graph");
                return;
            }
        };

        let dep_ids = task.dependency_ids().to_vec();
        graph.insert(task_id.to_string(), dep_ids.clone());
        for dep_id in &dep_ids {
            self.visit(dep_id, depth + 1, visited, graph);
        }
    }

    /// Whether any of `task`'s own dependencies still holds it up.
    fn has_unsettled_dependencies(&self, task: &Task) -> Result<bool> {
        for dep_id in task.dependency_ids() {
            if let Some(dep) = self.repo.find_by_id(dep_id)? {
                if !dep.status.is_settled() {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Snapshot of a related task from the perspective of the seed.
    pub fn dependency_info(&self, task: &Task, is_blocking: bool) -> Result<DependencyInfo> {
        let is_blocked = self.has_unsettled_dependencies(task)?;
        Ok(DependencyInfo::from_task(task, is_blocking, is_blocked))
    }

    fn direct_dependencies(&self, seed: &Task) -> Result<Vec<DependencyInfo>> {
        let mut infos = Vec::with_capacity(seed.dependency_ids().len());
        for dep_id in seed.dependency_ids() {
            match self.repo.find_by_id(dep_id)? {
                Some(dep) => infos.push(self.dependency_info(&dep, false)?),
                None => {
                    warn!(task_id = %seed.id, dependency = %dep_id, "Dependency references missing task");
                }
            }
        }
        Ok(infos)
    }

    /// Tasks whose dependency list contains the seed.
    fn blocking_tasks(&self, seed: &Task) -> Result<Vec<DependencyInfo>> {
        let mut infos = Vec::new();
        for task in self.repo.find_all()? {
            if task.id != seed.id && task.dependency_ids().iter().any(|id| id == &seed.id) {
                infos.push(self.dependency_info(&task, true)?);
            }
        }
        Ok(infos)
    }

    /// One breadth-first chain per direct dependency. The visited set is
    /// shared across chains so diamonds are reported once.
    fn upstream_chains(
        &self,
        seed_id: &str,
        depends_on: &[DependencyInfo],
        graph: &DependencyGraph,
    ) -> Result<Vec<DependencyChain>> {
        // The seed never appears in its own upstream, even on a cycle
        let mut visited: HashSet<String> = HashSet::from([seed_id.to_string()]);
        let mut chains = Vec::new();

        for start in depends_on {
            if visited.contains(&start.task_id) {
                continue;
            }

            let mut tasks = Vec::new();
            let mut queue = VecDeque::from([start.task_id.clone()]);
            while let Some(current) = queue.pop_front() {
                if !visited.insert(current.clone()) {
                    continue;
                }

                let Some(task) = self.repo.find_by_id(&current)? else {
                    continue;
                };
                tasks.push(self.dependency_info(&task, false)?);

                for next in graph.get(&current).into_iter().flatten() {
                    if !visited.contains(next) {
                        queue.push_back(next.clone());
                    }
                }
            }

            if !tasks.is_empty() {
                chains.push(DependencyChain::new(format!("upstream_{}", start.task_id), tasks));
            }
        }

        Ok(chains)
    }
}

fn summarize(total: usize, completed: usize, blocked: usize, blocking: usize) -> String {
    let mut summary = if total == 0 {
        "No dependencies".to_string()
    } else {
        format!("{} dependencies ({}/{} completed)", total, completed, total)
    };
    if blocked > 0 {
        summary.push_str(&format!(", {} blocked", blocked));
    }
    if blocking > 0 {
        summary.push_str(&format!("; blocking {} task(s)", blocking));
    }
    summary
}

fn suggest_next_actions(depends_on: &[DependencyInfo], blocking: usize) -> Vec<String> {
    let mut actions = Vec::new();
    let pending = depends_on
        .iter()
        .filter(|d| d.status != TaskStatus::Done)
        .count();

    if pending == 0 {
        if depends_on.is_empty() {
            actions.push("Ready to start - no dependencies".to_string());
        } else {
            actions.push("Ready to start - all dependencies complete".to_string());
        }
    } else {
        actions.push(format!("Wait for {} dependencies to complete", pending));

        let blocked = depends_on
            .iter()
            .filter(|d| d.status == TaskStatus::Blocked)
            .count();
        if blocked > 0 {
            actions.push(format!("Resolve {} blocked dependencies", blocked));
        }

        for dep in depends_on
            .iter()
            .filter(|d| d.status == TaskStatus::InProgress)
        {
            actions.push(format!(
                "Check progress on '{}' ({}% complete)",
                dep.title, dep.completion_percentage
            ));
        }
    }

    if blocking > 0 {
        actions.push(format!("Completing this task will unblock {} task(s)", blocking));
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_mentions_counts() {
        assert_eq!(summarize(0, 0, 0, 0), "No dependencies");
        assert_eq!(summarize(1, 1, 0, 0), "1 dependencies (1/1 completed)");
        assert_eq!(
            summarize(3, 1, 1, 2),
            "3 dependencies (1/3 completed), 1 blocked; blocking 2 task(s)"
        );
    }
}
