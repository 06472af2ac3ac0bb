//! Error taxonomy for dispatch.
//!
//! Every variant here is reported in-band as a `success=false` response frame
//! plus one FAIL audit record; none of them abort the call at the transport
//! level.

use thiserror::Error;

/// Failures the dispatcher converts into a failed [`OperationOutcome`].
///
/// [`OperationOutcome`]: crate::job::OperationOutcome
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No operation-parameter frame was observed anywhere in the request
    /// stream. Rejected before any filesystem or subprocess side effect.
    #[error("parameters missing")]
    ParameterMissing,

    /// The accumulated input bytes could not be persisted to working storage.
    #[error("failed to save input: {0}")]
    InputWrite(#[source] std::io::Error),

    /// The primary tool was present but did not exit cleanly. No fallback is
    /// attempted in this case.
    #[error("{tool} failed with exit code {code}")]
    ToolFailed {
        /// Program name of the tool that failed.
        tool: &'static str,
        /// Exit code, or -1 when the process was killed by a signal.
        code: i32,
    },

    /// The primary tool exceeded the configured deadline. Only reachable when
    /// `ServiceConfig::tool_timeout` is set.
    #[error("{tool} timed out")]
    ToolTimeout {
        /// Program name of the tool that was killed.
        tool: &'static str,
    },

    /// The copy-through fallback itself failed.
    #[error("fallback copy failed: {0}")]
    FallbackCopy(#[source] std::io::Error),
}
