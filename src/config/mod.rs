//! Unified configuration system.
//!
//! Configuration comes from tiers merged field by field:
//! 1. **Defaults** - compiled in
//! 2. **Project** - `$CWD/task-deps/config.yaml`
//! 3. **User** - `~/.task-deps/config.yaml`
//! 4. **Environment** - `TASK_DEPS_*` variables
//!
//! ## Environment Variables
//! - `TASK_DEPS_CONFIG_PATH` - Explicit config file (replaces the file tiers)
//! - `TASK_DEPS_DB_PATH` - Database path
//! - `TASK_DEPS_MAX_DEPTH` - Graph traversal depth cap
//! - `TASK_DEPS_MAX_SUGGESTIONS` - Suggestions returned per task
//! - `TASK_DEPS_USER_DIR` - User config dir (default: `~/.task-deps`)
//! - `TASK_DEPS_PROJECT_DIR` - Project config dir (default: `./task-deps`)

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier, apply_env_overrides};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
