//! Database component configuration
//!
//! Connection settings for the embedded SQLite store behind the compositor.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Path value that selects an in-memory database
pub const MEMORY_PATH: &str = ":memory:";

/// SQLite connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file, or `:memory:`
    pub path: PathBuf,
    /// Enforce foreign key constraints (`PRAGMA foreign_keys = ON`)
    pub foreign_keys: bool,
    /// Use write-ahead logging for file databases
    pub wal_mode: bool,
    /// How long a statement waits on a locked database
    pub busy_timeout_ms: u32,
    /// SQLite page cache size (negative values are KiB)
    pub cache_size: i64,
    /// Create missing parent directories of `path`
    pub create_parent_dirs: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./restomatic.db"),
            foreign_keys: false,
            wal_mode: false,
            busy_timeout_ms: 5000,
            cache_size: -2000,
            create_parent_dirs: true,
        }
    }
}

impl DatabaseConfig {
    /// Configuration for a database file at `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Configuration for a private in-memory database
    pub fn memory() -> Self {
        Self::new(MEMORY_PATH)
    }

    /// Builder-style toggle for foreign key enforcement
    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Builder-style toggle for WAL journaling
    pub fn with_wal_mode(mut self, enabled: bool) -> Self {
        self.wal_mode = enabled;
        self
    }

    /// True when this configuration opens an in-memory database
    pub fn is_memory(&self) -> bool {
        self.path.to_str() == Some(MEMORY_PATH)
    }
}
