//! Types for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single file-to-file transcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJob {
    /// Identifier used in logs (the conversion request id).
    pub job_id: String,
    /// Path of the downloaded source file.
    pub input_path: PathBuf,
    /// Path the transcoded file is written to.
    pub output_path: PathBuf,
}

/// Result of a successful transcode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeResult {
    /// Job identifier.
    pub job_id: String,
    /// Path to the output file.
    pub output_path: PathBuf,
    /// Output file size in bytes.
    pub output_size_bytes: u64,
    /// Wall-clock time spent transcoding in milliseconds.
    pub duration_ms: u64,
}

/// Progress parsed from ffmpeg's `-progress` output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscodeProgress {
    /// Output time reached so far, in seconds.
    pub time_secs: f64,
    /// Encoding speed as reported by ffmpeg (e.g., "2.5x").
    pub speed: Option<String>,
}
