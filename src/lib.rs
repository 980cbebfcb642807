//! Task Dependency MCP Server Library
//!
//! Task storage, dependency resolution and heuristic dependency suggestions,
//! exported for the binary and for integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod deps;
pub mod error;
pub mod format;
pub mod tools;
pub mod types;
