//! gRPC service implementation.
//!
//! One generic transform handler serves all four RPCs, parameterized by the
//! endpoint's [`OperationKind`]. Per call: drain the upload stream, dispatch,
//! then stream the result back through an mpsc channel. The audit log gets
//! exactly one record per call, written with the terminal success flag and
//! message after emission finishes.

use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tonic::{Request, Response, Status, Streaming};

use filemill::{AuditLog, Dispatcher, OperationKind, ServiceConfig};

use crate::proto::{TransformRequest, TransformResponse, file_mill_server};
use crate::{emit, ingest};

/// The FileMill gRPC service.
pub struct FileMillService {
    dispatcher: Arc<Dispatcher>,
    audit: Arc<AuditLog>,
}

impl std::fmt::Debug for FileMillService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileMillService")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl FileMillService {
    /// Service using the host's real tools.
    pub fn new(config: ServiceConfig) -> Self {
        let audit = AuditLog::new(config.audit_log.clone());
        Self {
            dispatcher: Arc::new(Dispatcher::new(config)),
            audit: Arc::new(audit),
        }
    }

    /// Service around a pre-built dispatcher. Tests use this to substitute
    /// tool invokers.
    pub fn with_dispatcher(dispatcher: Dispatcher) -> Self {
        let audit = AuditLog::new(dispatcher.config().audit_log.clone());
        Self {
            dispatcher: Arc::new(dispatcher),
            audit: Arc::new(audit),
        }
    }

    /// Shared body of the four RPCs.
    async fn handle(
        &self,
        kind: OperationKind,
        request: Request<Streaming<TransformRequest>>,
    ) -> Result<Response<TransformStream>, Status> {
        let upload = request.into_inner();

        // Drain the whole upload before any transformation starts.
        let job = match ingest::assemble(upload, kind).await {
            Ok(job) => job,
            Err(broken) => {
                // Transport broke mid-upload; this is the call's one record.
                self.audit.record(
                    kind,
                    broken.partial.display_name(),
                    false,
                    "client stream broken during upload",
                );
                return Err(broken.status);
            }
        };

        tracing::debug!(
            %kind,
            file = job.display_name(),
            bytes = job.input.len(),
            "upload assembled"
        );

        let (tx, rx) = mpsc::channel::<TransformResponse>(32);
        let dispatcher = Arc::clone(&self.dispatcher);
        let audit = Arc::clone(&self.audit);

        tokio::spawn(async move {
            let outcome = dispatcher.dispatch(&job).await;
            let (success, message) = match (&outcome.output, outcome.success) {
                (Some(path), true) => {
                    emit::stream_file_back(&tx, path, outcome.success, &outcome.message).await
                }
                // Failed dispatch: one terminal status frame, no content.
                _ => {
                    let _ = tx.send(emit::status_frame(false, &outcome.message)).await;
                    (false, outcome.message)
                }
            };
            audit.record(kind, job.display_name(), success, &message);
        });

        let stream = ReceiverStream::new(rx);
        Ok(Response::new(Box::pin(stream.map(Ok)) as TransformStream))
    }
}

type TransformStream = Pin<Box<dyn Stream<Item = Result<TransformResponse, Status>> + Send>>;

#[tonic::async_trait]
impl file_mill_server::FileMill for FileMillService {
    type CompressPdfStream = TransformStream;
    type ConvertToTextStream = TransformStream;
    type ConvertImageFormatStream = TransformStream;
    type ResizeImageStream = TransformStream;

    async fn compress_pdf(
        &self,
        request: Request<Streaming<TransformRequest>>,
    ) -> Result<Response<Self::CompressPdfStream>, Status> {
        self.handle(OperationKind::CompressPdf, request).await
    }

    async fn convert_to_text(
        &self,
        request: Request<Streaming<TransformRequest>>,
    ) -> Result<Response<Self::ConvertToTextStream>, Status> {
        self.handle(OperationKind::ConvertToText, request).await
    }

    async fn convert_image_format(
        &self,
        request: Request<Streaming<TransformRequest>>,
    ) -> Result<Response<Self::ConvertImageFormatStream>, Status> {
        self.handle(OperationKind::ConvertImageFormat, request).await
    }

    async fn resize_image(
        &self,
        request: Request<Streaming<TransformRequest>>,
    ) -> Result<Response<Self::ResizeImageStream>, Status> {
        self.handle(OperationKind::ResizeImage, request).await
    }
}

/// Server configuration and runner.
#[derive(Debug)]
pub struct FileMillServer {
    addr: std::net::SocketAddr,
    config: ServiceConfig,
}

impl FileMillServer {
    /// Server bound to `addr` serving with `config`.
    pub fn new(addr: std::net::SocketAddr, config: ServiceConfig) -> Self {
        Self { addr, config }
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let service = FileMillService::new(self.config);

        tracing::info!("filemill gRPC server listening on {}", self.addr);

        tonic::transport::Server::builder()
            .add_service(file_mill_server::FileMillServer::new(service))
            .serve_with_shutdown(self.addr, shutdown_signal())
            .await?;

        tracing::info!("gRPC server shut down");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
