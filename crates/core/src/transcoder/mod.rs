//! Transcoder module for turning downloaded videos into MP4 files.
//!
//! This module provides the `Transcoder` trait and an FFmpeg implementation
//! that runs `ffmpeg` as a child process, file to file.
//!
//! # Features
//!
//! - H.264/AAC output in an MP4 container with fast-start metadata
//! - Per-job timeout
//! - Cancellation: the child process is killed when the token fires
//! - Progress parsed from `-progress pipe:2` and logged at debug level
//!
//! # Example
//!
//! ```ignore
//! use vidconv_core::transcoder::{FfmpegTranscoder, Transcoder, TranscodeJob};
//!
//! let transcoder = FfmpegTranscoder::with_defaults();
//! transcoder.validate().await?;
//!
//! let job = TranscodeJob {
//!     job_id: "req-1".to_string(),
//!     input_path: PathBuf::from("/var/lib/vidconv/4b8f..."),
//!     output_path: PathBuf::from("/var/lib/vidconv/91ad....mp4"),
//! };
//! let result = transcoder.transcode(job, &CancellationToken::new()).await?;
//! println!("Transcoded in {} ms", result.duration_ms);
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::TranscoderConfig;
pub use error::TranscoderError;
pub use ffmpeg::FfmpegTranscoder;
pub use traits::Transcoder;
pub use types::{TranscodeJob, TranscodeProgress, TranscodeResult};
