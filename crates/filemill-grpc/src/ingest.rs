//! Stream-ingest assembler.
//!
//! Drains one call's upload stream into a [`Job`]. Frame order rules: the
//! first non-empty file name wins, content chunks append in arrival order,
//! and the first parameter frame matching the endpoint's operation wins
//! wherever it appears in the stream. Parameter variants belonging to a
//! different endpoint are ignored, so on the wrong RPC they count as missing
//! parameters.

use filemill::{Job, Operation, OperationKind};
use tokio_stream::{Stream, StreamExt};
use tonic::Status;

use crate::proto::{TransformRequest, transform_request::Params};

/// Transport failure mid-upload.
///
/// Carries whatever had been assembled so the call's single audit record can
/// name the file when a name frame had already arrived before the break.
#[derive(Debug)]
pub struct UploadBroken {
    /// The job as assembled up to the point the stream broke.
    pub partial: Job,
    /// The transport error that ended the stream.
    pub status: Status,
}

/// Read `stream` to exhaustion and assemble a [`Job`] for `kind`.
///
/// Never times out waiting for frames; the call ends when the client
/// half-closes. A transport error mid-upload is the only `Err` path.
pub async fn assemble<S>(mut stream: S, kind: OperationKind) -> Result<Job, UploadBroken>
where
    S: Stream<Item = Result<TransformRequest, Status>> + Unpin,
{
    let mut job = Job::default();
    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(status) => {
                return Err(UploadBroken {
                    partial: job,
                    status,
                });
            }
        };

        if job.file_name.is_empty() && !frame.file_name.is_empty() {
            job.file_name = frame.file_name;
        }

        if let Some(chunk) = frame.file_content {
            job.input.extend_from_slice(&chunk.content);
        }

        if job.operation.is_none()
            && let Some(params) = frame.params
        {
            job.operation = resolve(params, kind);
        }
    }
    Ok(job)
}

/// Map a wire parameter variant onto the endpoint's operation, applying the
/// ingest-time defaults (empty format, non-positive dimensions).
fn resolve(params: Params, kind: OperationKind) -> Option<Operation> {
    match (params, kind) {
        (Params::CompressPdf(_), OperationKind::CompressPdf) => Some(Operation::CompressPdf),
        (Params::ConvertToText(_), OperationKind::ConvertToText) => Some(Operation::ConvertToText),
        (Params::ConvertImageFormat(p), OperationKind::ConvertImageFormat) => {
            Some(Operation::convert_image_format(&p.output_format))
        }
        (Params::ResizeImage(p), OperationKind::ResizeImage) => {
            Some(Operation::resize_image(p.width, p.height))
        }
        _ => None,
    }
}
