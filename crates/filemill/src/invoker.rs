//! External tool invocation.
//!
//! The dispatcher only ever asks two questions of the host: "is this tool
//! installed?" and "run this argument vector, what was the exit code?". Both
//! sit behind [`ToolInvoker`] so tests can substitute hosts where a tool is
//! missing or misbehaves.

use std::io;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::ToolCommand;

/// Boundary between the dispatcher and the host's external tools.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Whether `tool` resolves to an executable on the host. Must not have
    /// side effects beyond the check itself.
    fn probe(&self, tool: &str) -> bool;

    /// Run `command` to completion and return its exit code, `-1` when the
    /// process was terminated by a signal. `Err` means the process could not
    /// be spawned or was cut off by the configured deadline.
    async fn run(&self, command: &ToolCommand) -> io::Result<i32>;
}

/// Production invoker: `PATH` scan for probing, `tokio::process` for running.
#[derive(Debug, Default)]
pub struct SystemInvoker {
    /// Optional per-invocation deadline. `None` means a hung tool blocks its
    /// call indefinitely, matching the service's historical behavior.
    pub timeout: Option<Duration>,
}

impl SystemInvoker {
    /// Invoker with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoker that kills a tool after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

#[async_trait]
impl ToolInvoker for SystemInvoker {
    fn probe(&self, tool: &str) -> bool {
        let Some(path) = std::env::var_os("PATH") else {
            return false;
        };
        std::env::split_paths(&path).any(|dir| is_executable(&dir.join(tool)))
    }

    async fn run(&self, command: &ToolCommand) -> io::Result<i32> {
        let mut child = tokio::process::Command::new(command.program)
            .args(&command.args)
            .stdin(std::process::Stdio::null())
            .spawn()?;

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    // Deadline hit: kill the tool and report a timeout.
                    let _ = child.kill().await;
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "tool timed out"));
                }
            },
            None => child.wait().await?,
        };

        Ok(status.code().unwrap_or(-1))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
