//! Dependency resolution and suggestion engine.
//!
//! [`DependencyResolver`] produces the authoritative view from declared
//! dependencies, [`ContentAnalyzer`] proposes heuristic ones, and
//! [`DependencyManagementEngine`] combines the two.

pub mod analyzer;
pub mod engine;
pub mod model;
pub mod repository;
pub mod resolver;

pub use analyzer::{ContentAnalyzer, DependencyHint, SuggestionType};
pub use engine::{
    DependencyManagementEngine, DependencySuggestion, EnhancedDependencyRelationships,
    PerformanceMetrics, SuggestionStatus,
};
pub use model::{ChainStatus, DependencyChain, DependencyInfo, DependencyRelationships, Resolution};
pub use repository::{InMemoryTaskRepository, TaskRepository};
pub use resolver::{DependencyGraph, DependencyResolver};
