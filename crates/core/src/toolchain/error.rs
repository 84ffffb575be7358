//! Error types for the toolchain module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving ffprobe/ffmpeg.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Failed to probe media file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// Failed to parse FFprobe output.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },

    /// Cover frame extraction failed.
    #[error("Failed to extract cover: {reason}")]
    CoverFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Segmenting/encrypting failed.
    #[error("Packaging failed: {reason}")]
    PackagingFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// I/O error while preparing or checking outputs.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolchainError {
    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Creates a new cover failed error with stderr output.
    pub fn cover_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::CoverFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new packaging failed error with stderr output.
    pub fn packaging_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::PackagingFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Error text including captured stderr, flattened for records and logs.
    pub fn detail(&self) -> String {
        match self {
            Self::CoverFailed {
                stderr: Some(stderr),
                ..
            }
            | Self::PackagingFailed {
                stderr: Some(stderr),
                ..
            } => format!("{}: {}", self, stderr.trim()),
            _ => self.to_string(),
        }
    }
}
