//! Append-only audit log.
//!
//! One line per call, in the fixed format
//! `[YYYY-MM-DD HH:MM:SS] SUCCESS|FAIL - Service: <op>, File: <name|->,
//! Message: <text>`. Appends are serialized by an internal lock so concurrent
//! calls never interleave partial lines; the lock itself is never exposed.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::catalog::OperationKind;

/// Handle to the shared audit log file.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditLog {
    /// Audit log appending to `path`. The file is created on first record.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Append one record.
    ///
    /// A log-write failure never fails the call it describes; it is reported
    /// through `tracing` and otherwise swallowed.
    pub fn record(&self, kind: OperationKind, file_name: &str, success: bool, message: &str) {
        let line = format_record(kind, file_name, success, message);
        let guard = self.lock.lock();
        // A poisoned lock only means another append panicked mid-write;
        // keep logging.
        let _guard = match guard {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{line}"));
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "audit append failed");
        }
    }
}

fn format_record(kind: OperationKind, file_name: &str, success: bool, message: &str) -> String {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let name = if file_name.is_empty() { "-" } else { file_name };
    let verdict = if success { "SUCCESS" } else { "FAIL" };
    format!("[{timestamp}] {verdict} - Service: {kind}, File: {name}, Message: {message}")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // unwrap is acceptable in tests

    use super::*;
    use std::sync::Arc;

    #[test]
    fn record_format_matches_the_contract() {
        let line = format_record(OperationKind::CompressPdf, "report.pdf", true, "PDF compressed");
        // [YYYY-MM-DD HH:MM:SS] is 21 chars followed by a space.
        assert_eq!(&line[0..1], "[");
        assert_eq!(&line[20..22], "] ");
        assert!(line.ends_with("SUCCESS - Service: CompressPdf, File: report.pdf, Message: PDF compressed"));
    }

    #[test]
    fn missing_file_name_logs_a_placeholder() {
        let line = format_record(OperationKind::ResizeImage, "", false, "parameters missing");
        assert!(line.contains("FAIL - Service: ResizeImage, File: -, Message: parameters missing"));
    }

    #[test]
    fn concurrent_records_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(AuditLog::new(dir.path().join("server.log")));

        let threads: Vec<_> = (0..16)
            .map(|i| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    let name = format!("file-{i}.pdf");
                    log.record(OperationKind::ConvertToText, &name, i % 2 == 0, "done");
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let contents = std::fs::read_to_string(dir.path().join("server.log")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 16);
        for line in lines {
            assert!(line.starts_with('['), "corrupt line: {line}");
            assert!(
                line.contains("Service: ConvertToText, File: file-"),
                "corrupt line: {line}"
            );
        }
    }

    #[test]
    fn append_failure_is_swallowed() {
        // Point the log at a directory: every append fails, none panic.
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path());
        log.record(OperationKind::CompressPdf, "x.pdf", true, "ok");
    }
}
