//! Stream emitter.
//!
//! Streams a dispatch output file back to the caller as fixed 1 MiB response
//! frames, each repeating the call's success flag and status message. If the
//! output cannot be opened, exactly one failure frame is emitted and no
//! content follows.

use std::path::Path;

use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

use filemill::CHUNK_SIZE;

use crate::proto::{FileChunk, TransformResponse};

/// Stream `path` into `tx` one chunk frame at a time.
///
/// Returns the terminal `(success, message)` pair for the call, downgraded
/// from the dispatch outcome when the output cannot be opened or read, or
/// when the client goes away mid-download.
pub async fn stream_file_back(
    tx: &mpsc::Sender<TransformResponse>,
    path: &Path,
    success: bool,
    message: &str,
) -> (bool, String) {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) => {
            let msg = format!("failed to open output {}: {e}", path.display());
            let _ = tx.send(status_frame(false, &msg)).await;
            return (false, msg);
        }
    };

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match file.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let frame = TransformResponse {
                    success,
                    status_message: message.to_string(),
                    file_content: Some(FileChunk {
                        content: buf[..n].to_vec(),
                    }),
                };
                if tx.send(frame).await.is_err() {
                    return (false, "client disconnected during download".to_string());
                }
            }
            Err(e) => {
                let msg = format!("failed to read output {}: {e}", path.display());
                let _ = tx.send(status_frame(false, &msg)).await;
                return (false, msg);
            }
        }
    }
    (success, message.to_string())
}

/// A content-free frame carrying only the status pair.
pub fn status_frame(success: bool, message: &str) -> TransformResponse {
    TransformResponse {
        success,
        status_message: message.to_string(),
        file_content: None,
    }
}
