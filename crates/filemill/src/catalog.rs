//! Operation catalog: the fixed table of supported transformations.
//!
//! Each operation declares its preferred external tool, how to build that
//! tool's argument vector, and the deterministic output-name rule. The
//! dispatcher stays generic over this table, so the four RPC endpoints share
//! one code path.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;

/// Default image format when `ConvertImageFormat` is called with an empty
/// format string.
pub const DEFAULT_IMAGE_FORMAT: &str = "png";

/// Default edge length substituted for non-positive resize dimensions.
pub const DEFAULT_DIMENSION: u32 = 512;

/// Identifies one of the four supported transformations.
///
/// The display name is stable; it appears verbatim in audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Compress a PDF with Ghostscript.
    CompressPdf,
    /// Extract text from a PDF with pdftotext.
    ConvertToText,
    /// Convert an image to another format with ImageMagick.
    ConvertImageFormat,
    /// Resize an image with ImageMagick.
    ResizeImage,
}

impl OperationKind {
    /// Stable name used in audit records and log lines.
    pub fn name(self) -> &'static str {
        match self {
            Self::CompressPdf => "CompressPdf",
            Self::ConvertToText => "ConvertToText",
            Self::ConvertImageFormat => "ConvertImageFormat",
            Self::ResizeImage => "ResizeImage",
        }
    }

    /// Program name of the external tool this operation prefers.
    pub fn primary_tool(self) -> &'static str {
        match self {
            Self::CompressPdf => "gs",
            Self::ConvertToText => "pdftotext",
            Self::ConvertImageFormat | Self::ResizeImage => "convert",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parameter-resolved operation variant.
///
/// Parameter defaults (empty format, non-positive dimensions) are substituted
/// by the constructors at ingest time, so dimensions seen here are the ones
/// that reach both the output file name and the tool's argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Compress a PDF.
    CompressPdf,
    /// Extract text from a PDF.
    ConvertToText,
    /// Convert an image to `format`.
    ConvertImageFormat {
        /// Target format / file extension, e.g. `png`, `jpg`, `webp`.
        format: String,
    },
    /// Resize an image to `width` x `height` pixels.
    ResizeImage {
        /// Target width in pixels.
        width: u32,
        /// Target height in pixels.
        height: u32,
    },
}

impl Operation {
    /// Build a `ConvertImageFormat`, substituting [`DEFAULT_IMAGE_FORMAT`]
    /// for an empty format string.
    pub fn convert_image_format(format: &str) -> Self {
        let format = if format.is_empty() {
            DEFAULT_IMAGE_FORMAT.to_string()
        } else {
            format.to_string()
        };
        Self::ConvertImageFormat { format }
    }

    /// Build a `ResizeImage`, substituting [`DEFAULT_DIMENSION`] for each
    /// non-positive dimension.
    pub fn resize_image(width: i32, height: i32) -> Self {
        let clamp = |v: i32| if v > 0 { v as u32 } else { DEFAULT_DIMENSION };
        Self::ResizeImage {
            width: clamp(width),
            height: clamp(height),
        }
    }

    /// The kind of this operation.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::CompressPdf => OperationKind::CompressPdf,
            Self::ConvertToText => OperationKind::ConvertToText,
            Self::ConvertImageFormat { .. } => OperationKind::ConvertImageFormat,
            Self::ResizeImage { .. } => OperationKind::ResizeImage,
        }
    }

    /// Deterministic output file name for a given input name.
    ///
    /// Repeated identical calls target the same path; nothing here is
    /// randomly generated.
    pub fn output_file_name(&self, input_name: &str) -> String {
        let stem = file_stem(input_name);
        match self {
            Self::CompressPdf => format!("out_compressed_{stem}.pdf"),
            Self::ConvertToText => format!("{stem}.txt"),
            Self::ConvertImageFormat { format } => format!("{stem}.{format}"),
            Self::ResizeImage { width, height } => format!("{stem}_{width}x{height}.img"),
        }
    }

    /// Argument vector for the primary tool.
    ///
    /// Paths are passed as single argv entries, never interpolated into a
    /// shell string, so embedded whitespace in file names cannot split or
    /// inject arguments.
    pub fn command(&self, input: &Path, output: &Path) -> ToolCommand {
        let args: Vec<OsString> = match self {
            Self::CompressPdf => {
                let mut out_flag = OsString::from("-sOutputFile=");
                out_flag.push(output.as_os_str());
                vec![
                    "-sDEVICE=pdfwrite".into(),
                    "-dCompatibilityLevel=1.4".into(),
                    "-dPDFSETTINGS=/screen".into(),
                    "-dNOPAUSE".into(),
                    "-dQUIET".into(),
                    "-dBATCH".into(),
                    out_flag,
                    input.as_os_str().to_os_string(),
                ]
            }
            Self::ConvertToText => vec![
                input.as_os_str().to_os_string(),
                output.as_os_str().to_os_string(),
            ],
            Self::ConvertImageFormat { .. } => vec![
                input.as_os_str().to_os_string(),
                "-strip".into(),
                output.as_os_str().to_os_string(),
            ],
            Self::ResizeImage { width, height } => vec![
                input.as_os_str().to_os_string(),
                "-resize".into(),
                format!("{width}x{height}").into(),
                output.as_os_str().to_os_string(),
            ],
        };
        ToolCommand {
            program: self.kind().primary_tool(),
            args,
        }
    }
}

/// An external tool invocation: program plus argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Program name, resolved through `PATH` at spawn time.
    pub program: &'static str,
    /// Arguments, one argv entry each.
    pub args: Vec<OsString>,
}

fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}
