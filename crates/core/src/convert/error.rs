//! Error types for the convert module.

use std::fmt;
use thiserror::Error;

use crate::transcoder::TranscoderError;

/// User-facing message for download failures.
pub const MSG_DOWNLOAD_FAILED: &str = "failed to download file";
/// User-facing message when the content type cannot be determined.
pub const MSG_CHECK_FORMAT_FAILED: &str = "failed to check file format";
/// User-facing message for a content type that is not video-like.
pub const MSG_UNSUPPORTED_FORMAT: &str = "unsupported format";
/// User-facing message for transcode failures.
pub const MSG_CONVERT_FAILED: &str = "failed to convert file";
/// User-facing message when the transcoded file cannot be opened.
pub const MSG_READ_FAILED: &str = "failed to read converted file";

/// Pipeline stage an error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Download,
    Transcode,
    Finalize,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Download => "download",
            Self::Transcode => "transcode",
            Self::Finalize => "finalize",
        })
    }
}

/// Errors that end a conversion.
///
/// None of these cross the state stream; each is turned into a single
/// `Error` state carrying [`user_message`](Self::user_message).
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Request construction, transfer or non-success HTTP status.
    #[error("Network failure: {reason}")]
    Network { reason: String },

    /// Response content type is missing or not video-like.
    #[error("Unsupported format: {}", media_type.as_deref().unwrap_or("<unknown>"))]
    UnsupportedFormat { media_type: Option<String> },

    /// A temp file could not be created, written or read.
    #[error("Storage failure during {stage}: {source}")]
    Storage {
        stage: PipelineStage,
        #[source]
        source: std::io::Error,
    },

    /// The external transcoder failed.
    #[error("Transcode failure: {0}")]
    Transcode(#[from] TranscoderError),

    /// The cancellation token fired.
    #[error("Conversion cancelled")]
    Cancelled,

    /// The consumer dropped the state stream.
    #[error("State stream consumer went away")]
    Abandoned,
}

impl ConvertError {
    /// Creates a network error.
    pub fn network(reason: impl Into<String>) -> Self {
        Self::Network {
            reason: reason.into(),
        }
    }

    /// Creates a storage error for the given stage.
    pub fn storage(stage: PipelineStage, source: std::io::Error) -> Self {
        Self::Storage { stage, source }
    }

    /// Short message shown to the user in the `Error` state.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network { .. } => MSG_DOWNLOAD_FAILED,
            Self::UnsupportedFormat { media_type: None } => MSG_CHECK_FORMAT_FAILED,
            Self::UnsupportedFormat { media_type: Some(_) } => MSG_UNSUPPORTED_FORMAT,
            Self::Storage { stage, .. } => match stage {
                PipelineStage::Download => MSG_DOWNLOAD_FAILED,
                PipelineStage::Transcode => MSG_CONVERT_FAILED,
                PipelineStage::Finalize => MSG_READ_FAILED,
            },
            Self::Transcode(TranscoderError::Cancelled) | Self::Cancelled | Self::Abandoned => {
                "cancelled"
            }
            Self::Transcode(_) => MSG_CONVERT_FAILED,
        }
    }

    /// Whether the request ended without anyone waiting for a state.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Abandoned | Self::Transcode(TranscoderError::Cancelled)
        )
    }

    /// Metrics label for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::Storage { .. } => "storage",
            Self::Transcode(_) => "transcode",
            Self::Cancelled => "cancelled",
            Self::Abandoned => "abandoned",
        }
    }
}
