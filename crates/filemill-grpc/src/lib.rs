//! filemill gRPC server
//!
//! Exposes the filemill dispatch engine over four bidirectional streaming
//! RPCs: `CompressPdf`, `ConvertToText`, `ConvertImageFormat` and
//! `ResizeImage`. The client uploads one parameter frame plus 1 MiB content
//! chunks and half-closes; the server drains the whole upload, runs the
//! transformation, then streams the output file back with per-frame status.
//!
//! # Example flow
//!
//! ```text
//! Client                                      Server
//! │                                             │
//! │  TransformRequest{file_name, resize params} │
//! │ ───────────────────────────────────────────>│
//! │  TransformRequest{chunk}  (repeated)        │
//! │ ───────────────────────────────────────────>│
//! │  (half-close)                               │
//! │ ───────────────────────────────────────────>│
//! │                                             │ persist in_<name>,
//! │                                             │ probe tool, transform
//! │                                             │
//! │  TransformResponse{success, message, chunk} │
//! │<─────────────────────────────────────────── │  (repeated)
//! ```
//!
//! Failures (missing parameters, tool exit != 0, unreadable output) come back
//! in-band as a single `success=false` frame; only genuine transport breakage
//! ends the call with a non-OK status.

/// Generated protobuf/tonic types for the `filemill.v1` wire schema.
pub mod proto {
    #![allow(missing_docs)]
    #![allow(clippy::doc_markdown)]
    tonic::include_proto!("filemill.v1");
}

pub mod emit;
pub mod ingest;
mod server;

pub use server::{FileMillServer, FileMillService};

// Re-export the frame types and generated stubs for clients and tests.
pub use proto::{
    FileChunk, TransformRequest, TransformResponse, file_mill_client::FileMillClient,
    file_mill_server::FileMillServer as FileMillGrpcServer,
};
