//! filemill client.
//!
//! Uploads a local file to the filemill server as one parameter frame
//! followed by 1 MiB content chunks, half-closes, then writes the streamed
//! response to a local output file, printing each in-band status line.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use filemill::CHUNK_SIZE;
use filemill_grpc::proto::{
    CompressPdfParams, ConvertImageFormatParams, ConvertToTextParams, FileChunk,
    ResizeImageParams, TransformRequest, TransformResponse, file_mill_client::FileMillClient,
    transform_request::Params,
};

/// filemill - send a file to the transformation service
#[derive(Parser, Debug)]
#[command(name = "filemill")]
#[command(about = "Client for the filemill file-transformation service")]
struct Args {
    /// Server to connect to
    #[arg(long, default_value = "http://localhost:50051")]
    target: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress a PDF with the server's PDF compressor
    CompressPdf {
        /// Local file to upload
        input: PathBuf,
        /// Where to write the compressed PDF
        output: PathBuf,
    },
    /// Extract text from a PDF
    ConvertToText {
        /// Local file to upload
        input: PathBuf,
        /// Where to write the extracted text
        output: PathBuf,
    },
    /// Convert an image to another format
    ConvertImage {
        /// Local file to upload
        input: PathBuf,
        /// Where to write the converted image
        output: PathBuf,
        /// Target format, e.g. png, jpg, webp
        #[arg(long, default_value = "png")]
        format: String,
    },
    /// Resize an image
    ResizeImage {
        /// Local file to upload
        input: PathBuf,
        /// Where to write the resized image
        output: PathBuf,
        /// Target width in pixels
        #[arg(long, default_value_t = 512)]
        width: i32,
        /// Target height in pixels
        #[arg(long, default_value_t = 512)]
        height: i32,
    },
}

impl Command {
    fn input(&self) -> &Path {
        match self {
            Self::CompressPdf { input, .. }
            | Self::ConvertToText { input, .. }
            | Self::ConvertImage { input, .. }
            | Self::ResizeImage { input, .. } => input,
        }
    }

    fn output(&self) -> &Path {
        match self {
            Self::CompressPdf { output, .. }
            | Self::ConvertToText { output, .. }
            | Self::ConvertImage { output, .. }
            | Self::ResizeImage { output, .. } => output,
        }
    }

    fn params(&self) -> Params {
        match self {
            Self::CompressPdf { .. } => Params::CompressPdf(CompressPdfParams {}),
            Self::ConvertToText { .. } => Params::ConvertToText(ConvertToTextParams {}),
            Self::ConvertImage { format, .. } => {
                Params::ConvertImageFormat(ConvertImageFormatParams {
                    output_format: format.clone(),
                })
            }
            Self::ResizeImage { width, height, .. } => Params::ResizeImage(ResizeImageParams {
                width: *width,
                height: *height,
            }),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .init();

    let args = Args::parse();
    let input = args.command.input().to_path_buf();
    let output = args.command.output().to_path_buf();

    // Open the input before any frame is sent; a missing file aborts the
    // call entirely.
    let file = tokio::fs::File::open(&input)
        .await
        .with_context(|| format!("failed to open input file {}", input.display()))?;
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (tx, rx) = mpsc::channel::<TransformRequest>(8);
    tokio::spawn(upload(file, file_name, args.command.params(), tx));

    let mut client = FileMillClient::connect(args.target.clone())
        .await
        .with_context(|| format!("failed to connect to {}", args.target))?;

    let upload_stream = ReceiverStream::new(rx);
    let responses = match &args.command {
        Command::CompressPdf { .. } => client.compress_pdf(upload_stream).await,
        Command::ConvertToText { .. } => client.convert_to_text(upload_stream).await,
        Command::ConvertImage { .. } => client.convert_image_format(upload_stream).await,
        Command::ResizeImage { .. } => client.resize_image(upload_stream).await,
    }
    .context("call failed")?
    .into_inner();

    let success = download(responses, &output).await?;
    if success {
        println!("output saved to {}", output.display());
        Ok(())
    } else {
        anyhow::bail!("transformation failed, see server messages above");
    }
}

/// Send one parameter frame, then the file as 1 MiB chunk frames. Dropping
/// the sender half-closes the upload.
async fn upload(
    mut file: tokio::fs::File,
    file_name: String,
    params: Params,
    tx: mpsc::Sender<TransformRequest>,
) {
    let head = TransformRequest {
        file_name,
        file_content: None,
        params: Some(params),
    };
    if tx.send(head).await.is_err() {
        return;
    }

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match file.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let frame = TransformRequest {
                    file_name: String::new(),
                    file_content: Some(FileChunk {
                        content: buf[..n].to_vec(),
                    }),
                    params: None,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "reading input failed mid-upload");
                break;
            }
        }
    }
}

/// Write response chunks to a freshly created output file in arrival order,
/// printing every status line; returns the last success flag seen.
async fn download(
    mut responses: tonic::Streaming<TransformResponse>,
    output: &Path,
) -> anyhow::Result<bool> {
    let mut out = tokio::fs::File::create(output)
        .await
        .with_context(|| format!("failed to create output file {}", output.display()))?;

    let mut success = false;
    while let Some(frame) = responses.next().await {
        let frame = frame.context("stream broken")?;
        if let Some(chunk) = &frame.file_content {
            out.write_all(&chunk.content).await?;
        }
        println!(
            "[server] success={} message={}",
            frame.success, frame.status_message
        );
        success = frame.success;
    }
    out.flush().await?;
    Ok(success)
}
