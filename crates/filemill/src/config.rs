//! Service configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the dispatch engine.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding `in_<name>` working files and operation outputs.
    /// Created on first use; files are left behind for external housekeeping.
    pub storage_dir: PathBuf,
    /// Path of the append-only audit log.
    pub audit_log: PathBuf,
    /// Optional deadline for one external tool invocation. `None` preserves
    /// the historical behavior: a hung tool blocks its call indefinitely.
    pub tool_timeout: Option<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("storage"),
            audit_log: PathBuf::from("server.log"),
            tool_timeout: None,
        }
    }
}
