//! Per-call job state.

use std::path::PathBuf;

use crate::catalog::Operation;

/// One transformation call's assembled state.
///
/// Built by the stream-ingest assembler, owned by the handling call, dropped
/// when the call returns. The entire input is buffered here before dispatch
/// begins; there is no incremental transformation.
#[derive(Debug, Default)]
pub struct Job {
    /// First non-empty file name observed in the request stream.
    pub file_name: String,
    /// Accumulated input bytes, appended in frame-arrival order.
    pub input: Vec<u8>,
    /// Resolved operation, `None` until a parameter frame is observed.
    pub operation: Option<Operation>,
}

impl Job {
    /// File name for audit records: `-` when no name was ever observed.
    pub fn display_name(&self) -> &str {
        if self.file_name.is_empty() {
            "-"
        } else {
            &self.file_name
        }
    }
}

/// Result of dispatching one job.
#[derive(Debug)]
pub struct OperationOutcome {
    /// Path of the produced output file, when one was written.
    pub output: Option<PathBuf>,
    /// Whether the transformation succeeded.
    pub success: bool,
    /// Human-readable status, repeated on every response frame.
    pub message: String,
}

impl OperationOutcome {
    /// A failed outcome with no output file.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            output: None,
            success: false,
            message: message.into(),
        }
    }
}
