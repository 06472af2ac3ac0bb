//! Transformation dispatcher.
//!
//! Takes an assembled [`Job`], persists its input to working storage, probes
//! for the operation's primary tool and either invokes it or falls back to a
//! copy-through. Fallback is selected on tool *absence* only: a tool that is
//! present but exits non-zero is a terminal failure with no fallback attempt.

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::catalog::{Operation, OperationKind};
use crate::config::ServiceConfig;
use crate::error::DispatchError;
use crate::invoker::{SystemInvoker, ToolInvoker};
use crate::job::{Job, OperationOutcome};

/// Routes assembled jobs through the operation catalog.
pub struct Dispatcher {
    config: ServiceConfig,
    invoker: Arc<dyn ToolInvoker>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Dispatcher using the host's real tools.
    pub fn new(config: ServiceConfig) -> Self {
        let invoker = match config.tool_timeout {
            Some(limit) => SystemInvoker::with_timeout(limit),
            None => SystemInvoker::new(),
        };
        Self {
            config,
            invoker: Arc::new(invoker),
        }
    }

    /// Dispatcher with a caller-supplied invoker. Tests use this to simulate
    /// absent or misbehaving tools.
    pub fn with_invoker(config: ServiceConfig, invoker: Arc<dyn ToolInvoker>) -> Self {
        Self { config, invoker }
    }

    /// The configuration this dispatcher was built with.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Run one job to completion.
    ///
    /// Every failure in the taxonomy is converted into a failed
    /// [`OperationOutcome`]; nothing here surfaces as a transport error. A
    /// job with no operation is rejected before any filesystem write.
    pub async fn dispatch(&self, job: &Job) -> OperationOutcome {
        let Some(operation) = &job.operation else {
            return OperationOutcome::failure(DispatchError::ParameterMissing.to_string());
        };
        match self.transform(operation, job).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(operation = %operation.kind(), error = %e, "dispatch failed");
                OperationOutcome::failure(e.to_string())
            }
        }
    }

    async fn transform(
        &self,
        operation: &Operation,
        job: &Job,
    ) -> Result<OperationOutcome, DispatchError> {
        tokio::fs::create_dir_all(&self.config.storage_dir)
            .await
            .map_err(DispatchError::InputWrite)?;

        // Wire names are untrusted; only the base component reaches storage.
        let file_name = base_name(&job.file_name);
        let input_path = self.config.storage_dir.join(format!("in_{file_name}"));
        tokio::fs::write(&input_path, &job.input)
            .await
            .map_err(DispatchError::InputWrite)?;

        let output_path = self
            .config
            .storage_dir
            .join(operation.output_file_name(file_name));

        let kind = operation.kind();
        let tool = kind.primary_tool();

        if self.invoker.probe(tool) {
            let command = operation.command(&input_path, &output_path);
            tracing::debug!(%kind, tool, "invoking primary tool");
            let code = match self.invoker.run(&command).await {
                Ok(code) => code,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    return Err(DispatchError::ToolTimeout { tool });
                }
                // Probe said present but the spawn failed anyway; still a
                // terminal tool failure, not a fallback trigger.
                Err(e) => {
                    tracing::warn!(tool, error = %e, "tool spawn failed");
                    return Err(DispatchError::ToolFailed { tool, code: -1 });
                }
            };
            if code != 0 {
                return Err(DispatchError::ToolFailed { tool, code });
            }
            Ok(OperationOutcome {
                output: Some(output_path),
                success: true,
                message: success_message(kind).to_string(),
            })
        } else {
            tracing::debug!(%kind, tool, "tool not found, copying input through");
            tokio::fs::copy(&input_path, &output_path)
                .await
                .map_err(DispatchError::FallbackCopy)?;
            Ok(OperationOutcome {
                output: Some(output_path),
                success: true,
                message: fallback_message(kind),
            })
        }
    }
}

/// Strip any directory components a client may have smuggled into the wire
/// file name.
fn base_name(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
}

fn success_message(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::CompressPdf => "PDF compressed",
        OperationKind::ConvertToText => "converted to text",
        OperationKind::ConvertImageFormat => "image converted",
        OperationKind::ResizeImage => "image resized",
    }
}

fn fallback_message(kind: OperationKind) -> String {
    format!(
        "{} not available, input copied unchanged",
        kind.primary_tool()
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // unwrap is acceptable in tests

    use super::*;
    use crate::catalog::ToolCommand;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Host with no tools installed at all.
    struct AbsentTools;

    #[async_trait]
    impl ToolInvoker for AbsentTools {
        fn probe(&self, _tool: &str) -> bool {
            false
        }
        async fn run(&self, _command: &ToolCommand) -> io::Result<i32> {
            panic!("run must not be called when the tool is absent");
        }
    }

    /// Host where every tool exists but always exits non-zero.
    struct FailingTool;

    #[async_trait]
    impl ToolInvoker for FailingTool {
        fn probe(&self, _tool: &str) -> bool {
            true
        }
        async fn run(&self, _command: &ToolCommand) -> io::Result<i32> {
            Ok(1)
        }
    }

    /// Host where every tool exists but never finishes inside the deadline.
    struct HangingTool;

    #[async_trait]
    impl ToolInvoker for HangingTool {
        fn probe(&self, _tool: &str) -> bool {
            true
        }
        async fn run(&self, _command: &ToolCommand) -> io::Result<i32> {
            Err(io::Error::new(io::ErrorKind::TimedOut, "tool timed out"))
        }
    }

    /// Host that records the command it was asked to run and reports success.
    #[derive(Default)]
    struct RecordingTool {
        seen: Mutex<Option<ToolCommand>>,
    }

    #[async_trait]
    impl ToolInvoker for RecordingTool {
        fn probe(&self, _tool: &str) -> bool {
            true
        }
        async fn run(&self, command: &ToolCommand) -> io::Result<i32> {
            *self.seen.lock().unwrap() = Some(command.clone());
            Ok(0)
        }
    }

    fn config_in(dir: &std::path::Path) -> ServiceConfig {
        ServiceConfig {
            storage_dir: dir.join("storage"),
            audit_log: dir.join("server.log"),
            tool_timeout: None,
        }
    }

    #[tokio::test]
    async fn missing_parameters_have_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let storage = config.storage_dir.clone();
        let dispatcher = Dispatcher::with_invoker(config, Arc::new(AbsentTools));

        let job = Job {
            file_name: "report.pdf".to_string(),
            input: b"%PDF-1.4".to_vec(),
            operation: None,
        };
        let outcome = dispatcher.dispatch(&job).await;

        assert!(!outcome.success);
        assert_eq!(outcome.message, "parameters missing");
        assert!(outcome.output.is_none());
        assert!(!storage.exists(), "no working file may be created");
    }

    #[tokio::test]
    async fn text_fallback_copies_input_bytes_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let storage = config.storage_dir.clone();
        let dispatcher = Dispatcher::with_invoker(config, Arc::new(AbsentTools));

        let input = b"alpha\x00beta\xffgamma".to_vec();
        let job = Job {
            file_name: "notes.pdf".to_string(),
            input: input.clone(),
            operation: Some(Operation::ConvertToText),
        };
        let outcome = dispatcher.dispatch(&job).await;

        assert!(outcome.success);
        assert_eq!(
            outcome.message,
            "pdftotext not available, input copied unchanged"
        );
        let out = outcome.output.unwrap();
        assert_eq!(out, storage.join("notes.txt"));
        assert_eq!(std::fs::read(out).unwrap(), input);
        assert_eq!(std::fs::read(storage.join("in_notes.pdf")).unwrap(), input);
    }

    #[tokio::test]
    async fn present_but_failing_tool_does_not_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let storage = config.storage_dir.clone();
        let dispatcher = Dispatcher::with_invoker(config, Arc::new(FailingTool));

        let job = Job {
            file_name: "scan.png".to_string(),
            input: vec![1, 2, 3],
            operation: Some(Operation::convert_image_format("jpg")),
        };
        let outcome = dispatcher.dispatch(&job).await;

        assert!(!outcome.success);
        assert_eq!(outcome.message, "convert failed with exit code 1");
        assert_ne!(
            outcome.message,
            fallback_message(OperationKind::ConvertImageFormat)
        );
        // No copy-through happened.
        assert!(!storage.join("scan.jpg").exists());
    }

    #[tokio::test]
    async fn resolved_dimensions_reach_name_and_argv() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let storage = config.storage_dir.clone();
        let recorder = Arc::new(RecordingTool::default());
        let dispatcher = Dispatcher::with_invoker(config, recorder.clone());

        let job = Job {
            file_name: "pic.png".to_string(),
            input: vec![0u8; 8],
            operation: Some(Operation::resize_image(0, -5)),
        };
        let outcome = dispatcher.dispatch(&job).await;

        assert!(outcome.success);
        assert_eq!(outcome.message, "image resized");
        assert_eq!(outcome.output.unwrap(), storage.join("pic_512x512.img"));
        let seen = recorder.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.program, "convert");
        assert!(seen.args.contains(&"512x512".into()));
    }

    #[tokio::test]
    async fn unwritable_storage_is_an_input_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        // A plain file where the storage dir should be: every write fails,
        // whatever user the tests run as.
        std::fs::write(&config.storage_dir, b"not a directory").unwrap();
        let dispatcher = Dispatcher::with_invoker(config, Arc::new(AbsentTools));

        let job = Job {
            file_name: "report.pdf".to_string(),
            input: b"%PDF".to_vec(),
            operation: Some(Operation::CompressPdf),
        };
        let outcome = dispatcher.dispatch(&job).await;

        assert!(!outcome.success);
        assert!(
            outcome.message.starts_with("failed to save input:"),
            "unexpected message: {}",
            outcome.message
        );
        assert!(outcome.output.is_none());
    }

    #[tokio::test]
    async fn failed_fallback_copy_is_reported_in_band() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let storage = config.storage_dir.clone();
        // Output path occupied by a directory: the copy-through cannot land.
        std::fs::create_dir_all(storage.join("notes.txt")).unwrap();
        let dispatcher = Dispatcher::with_invoker(config, Arc::new(AbsentTools));

        let job = Job {
            file_name: "notes.pdf".to_string(),
            input: b"some text".to_vec(),
            operation: Some(Operation::ConvertToText),
        };
        let outcome = dispatcher.dispatch(&job).await;

        assert!(!outcome.success);
        assert!(
            outcome.message.starts_with("fallback copy failed:"),
            "unexpected message: {}",
            outcome.message
        );
        assert!(outcome.output.is_none());
        // The input had already been persisted when the copy failed.
        assert!(storage.join("in_notes.pdf").exists());
    }

    #[tokio::test]
    async fn deadline_overrun_maps_to_a_timeout_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let storage = config.storage_dir.clone();
        let dispatcher = Dispatcher::with_invoker(config, Arc::new(HangingTool));

        let job = Job {
            file_name: "doc.pdf".to_string(),
            input: b"%PDF".to_vec(),
            operation: Some(Operation::CompressPdf),
        };
        let outcome = dispatcher.dispatch(&job).await;

        assert!(!outcome.success);
        assert_eq!(outcome.message, "gs timed out");
        assert!(outcome.output.is_none());
        // A timed-out tool is not a fallback trigger.
        assert!(!storage.join("out_compressed_doc.pdf").exists());
    }

    #[tokio::test]
    async fn path_components_in_wire_names_are_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let storage = config.storage_dir.clone();
        let dispatcher = Dispatcher::with_invoker(config, Arc::new(AbsentTools));

        let input = b"plain text".to_vec();
        let job = Job {
            file_name: "../../notes.pdf".to_string(),
            input: input.clone(),
            operation: Some(Operation::ConvertToText),
        };
        let outcome = dispatcher.dispatch(&job).await;

        assert!(outcome.success);
        // Working files stay inside the storage dir under the base name.
        assert_eq!(outcome.output.as_deref(), Some(storage.join("notes.txt").as_path()));
        assert_eq!(std::fs::read(storage.join("in_notes.pdf")).unwrap(), input);
        assert!(!dir.path().join("notes.txt").exists());
        assert!(!dir.path().join("in_notes.pdf").exists());
    }

    #[tokio::test]
    async fn repeated_calls_target_the_same_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let storage = config.storage_dir.clone();
        let dispatcher = Dispatcher::with_invoker(config, Arc::new(AbsentTools));

        let job = Job {
            file_name: "report.pdf".to_string(),
            input: b"%PDF".to_vec(),
            operation: Some(Operation::CompressPdf),
        };
        let first = dispatcher.dispatch(&job).await.output.unwrap();
        let second = dispatcher.dispatch(&job).await.output.unwrap();
        assert_eq!(first, storage.join("out_compressed_report.pdf"));
        assert_eq!(first, second);
    }
}
