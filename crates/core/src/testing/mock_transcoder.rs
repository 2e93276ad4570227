//! Mock transcoder for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::transcoder::{TranscodeJob, TranscodeResult, Transcoder, TranscoderError};

/// What the mock does when asked to transcode.
#[derive(Debug, Clone)]
pub enum MockTranscodeBehavior {
    /// Write these bytes as the output and succeed.
    Succeed(Vec<u8>),
    /// Write a partial output and fail like a non-zero ffmpeg exit.
    Fail,
    /// Write a partial output and wait until cancelled.
    Hang,
}

/// A recorded transcode call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTranscode {
    /// The job that was submitted.
    pub job: TranscodeJob,
    /// Contents of the input file at call time.
    pub input: Option<Vec<u8>>,
}

/// Mock implementation of the Transcoder trait.
///
/// Provides controllable behavior for testing:
/// - Track transcode jobs and the input they saw
/// - Simulate success, failure or a process that never exits
///
/// # Example
///
/// ```rust,ignore
/// use vidconv_core::testing::{MockTranscoder, MockTranscodeBehavior};
///
/// let transcoder = Arc::new(MockTranscoder::new());
/// transcoder.set_behavior(MockTranscodeBehavior::Fail).await;
///
/// let service = ConvertService::new(config, Arc::clone(&transcoder))?;
/// // ... run a conversion ...
///
/// assert_eq!(transcoder.transcode_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockTranscoder {
    /// Recorded transcodes.
    transcodes: Arc<RwLock<Vec<RecordedTranscode>>>,
    /// Behavior for the next calls.
    behavior: Arc<RwLock<MockTranscodeBehavior>>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    /// Create a mock that succeeds with a small fake MP4.
    pub fn new() -> Self {
        Self {
            transcodes: Arc::new(RwLock::new(Vec::new())),
            behavior: Arc::new(RwLock::new(MockTranscodeBehavior::Succeed(
                b"\x00\x00\x00\x18ftypmp42".to_vec(),
            ))),
        }
    }

    /// Set the behavior for subsequent transcodes.
    pub async fn set_behavior(&self, behavior: MockTranscodeBehavior) {
        *self.behavior.write().await = behavior;
    }

    /// Get all recorded transcodes.
    pub async fn recorded_transcodes(&self) -> Vec<RecordedTranscode> {
        self.transcodes.read().await.clone()
    }

    /// Get the number of transcodes started.
    pub async fn transcode_count(&self) -> usize {
        self.transcodes.read().await.len()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcode(
        &self,
        job: TranscodeJob,
        cancel: &CancellationToken,
    ) -> Result<TranscodeResult, TranscoderError> {
        let input = tokio::fs::read(&job.input_path).await.ok();
        let behavior = self.behavior.read().await.clone();

        let output = match &behavior {
            MockTranscodeBehavior::Succeed(bytes) => bytes.clone(),
            MockTranscodeBehavior::Fail | MockTranscodeBehavior::Hang => b"partial".to_vec(),
        };
        tokio::fs::write(&job.output_path, &output).await?;

        self.transcodes.write().await.push(RecordedTranscode {
            job: job.clone(),
            input,
        });

        match behavior {
            MockTranscodeBehavior::Succeed(_) => Ok(TranscodeResult {
                job_id: job.job_id,
                output_path: job.output_path,
                output_size_bytes: output.len() as u64,
                duration_ms: 0,
            }),
            MockTranscodeBehavior::Fail => Err(TranscoderError::conversion_failed(
                "ffmpeg exited with exit status: 1",
                Some("Invalid data found when processing input".to_string()),
            )),
            MockTranscodeBehavior::Hang => {
                cancel.cancelled().await;
                Err(TranscoderError::Cancelled)
            }
        }
    }

    async fn validate(&self) -> Result<(), TranscoderError> {
        Ok(())
    }
}
