//! filemill gRPC server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use filemill::ServiceConfig;
use filemill_grpc::FileMillServer;

/// filemill - remote file transformation over gRPC
#[derive(Parser, Debug)]
#[command(name = "filemill-grpc")]
#[command(about = "gRPC server providing PDF/text/image transformations")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:50051")]
    addr: SocketAddr,

    /// Directory for working files (inputs and transformation outputs)
    #[arg(long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Append-only audit log file
    #[arg(long, default_value = "server.log")]
    log_file: PathBuf,

    /// Kill an external tool after this many seconds. Unset means a hung
    /// tool blocks its call indefinitely.
    #[arg(long)]
    tool_timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();

    let config = ServiceConfig {
        storage_dir: args.storage_dir,
        audit_log: args.log_file,
        tool_timeout: args.tool_timeout_secs.map(Duration::from_secs),
    };

    let server = FileMillServer::new(args.addr, config);
    server.run().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    Ok(())
}
