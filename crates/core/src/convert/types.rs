//! Types for the convert module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

use super::temp::DeleteOnCloseFile;

/// A request to convert the video behind `source_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertRequest {
    /// Direct URL of the source video.
    pub source_url: String,
}

impl ConvertRequest {
    /// Creates a request for the given URL.
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
        }
    }
}

/// Status carried by each state on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvertStatus {
    Downloading,
    Converting,
    Done,
    Error,
    Unsupported,
}

impl ConvertStatus {
    /// Returns the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Downloading => "downloading",
            Self::Converting => "converting",
            Self::Done => "done",
            Self::Error => "error",
            Self::Unsupported => "unsupported",
        }
    }

    /// Whether no further states follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Unsupported)
    }
}

impl fmt::Display for ConvertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The converted file handed to the consumer.
///
/// `data` deletes the file when closed (or dropped).
#[derive(Debug)]
pub struct ConvertResult {
    /// Name to present the file under.
    pub filename: String,
    /// Delete-on-close read handle.
    pub data: DeleteOnCloseFile,
}

impl ConvertResult {
    /// Closes the data handle, deleting the backing file.
    pub async fn close(self) -> io::Result<()> {
        self.data.close().await
    }
}

/// One entry of the state stream.
///
/// `result` is present iff the status is `Done`; `error_message` is present
/// iff the status is `Error`. The constructors are the only way to build a
/// state, so both invariants always hold.
#[derive(Debug)]
pub struct ConvertState {
    status: ConvertStatus,
    result: Option<ConvertResult>,
    error_message: Option<String>,
}

impl ConvertState {
    pub fn downloading() -> Self {
        Self::bare(ConvertStatus::Downloading)
    }

    pub fn converting() -> Self {
        Self::bare(ConvertStatus::Converting)
    }

    pub fn unsupported() -> Self {
        Self::bare(ConvertStatus::Unsupported)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ConvertStatus::Error,
            result: None,
            error_message: Some(message.into()),
        }
    }

    pub fn done(result: ConvertResult) -> Self {
        Self {
            status: ConvertStatus::Done,
            result: Some(result),
            error_message: None,
        }
    }

    fn bare(status: ConvertStatus) -> Self {
        Self {
            status,
            result: None,
            error_message: None,
        }
    }

    pub fn status(&self) -> ConvertStatus {
        self.status
    }

    pub fn result(&self) -> Option<&ConvertResult> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Consumes the state, yielding the result of a `Done` state.
    pub fn into_result(self) -> Option<ConvertResult> {
        self.result
    }

    /// Releases the result's file, if any.
    pub async fn cleanup(self) -> io::Result<()> {
        match self.result {
            Some(result) => result.close().await,
            None => Ok(()),
        }
    }
}
