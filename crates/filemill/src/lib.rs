//! Core dispatch engine for the filemill file-transformation service.
//!
//! A transformation call arrives as a stream of frames carrying a file name,
//! raw byte chunks and exactly one operation-parameter variant. The transport
//! layer assembles those frames into a [`Job`] and hands it to the
//! [`Dispatcher`], which persists the input to working storage, probes for the
//! operation's preferred external tool and either invokes it or falls back to
//! copying the input through unchanged. The outcome (output path, success
//! flag, status message) is returned to the transport layer for streaming back
//! to the caller, and every call leaves exactly one line in the append-only
//! audit log.
//!
//! This crate knows nothing about the wire: the gRPC surface lives in
//! `filemill-grpc` and consumes this crate through [`Job`], [`Dispatcher`] and
//! [`AuditLog`].

pub mod audit;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod invoker;
pub mod job;

pub use audit::AuditLog;
pub use catalog::{Operation, OperationKind, ToolCommand};
pub use config::ServiceConfig;
pub use dispatch::Dispatcher;
pub use error::DispatchError;
pub use invoker::{SystemInvoker, ToolInvoker};
pub use job::{Job, OperationOutcome};

/// Fixed transfer chunk size, both directions: 1 MiB.
pub const CHUNK_SIZE: usize = 1024 * 1024;
