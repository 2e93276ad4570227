//! Trait definitions for the transcoder module.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::TranscoderError;
use super::types::{TranscodeJob, TranscodeResult};

/// A transcoder that turns a downloaded file into the target container/codec.
///
/// Implementations must stop promptly once `cancel` fires and return
/// [`TranscoderError::Cancelled`]. A partial output file may be left at
/// `job.output_path` on any error; removing it is the caller's job.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Transcodes `job.input_path` into `job.output_path`.
    async fn transcode(
        &self,
        job: TranscodeJob,
        cancel: &CancellationToken,
    ) -> Result<TranscodeResult, TranscoderError>;

    /// Validates that the transcoder is properly configured and ready.
    async fn validate(&self) -> Result<(), TranscoderError>;

    /// Extension of the files this transcoder produces.
    fn output_extension(&self) -> &str {
        "mp4"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CopyTranscoder;

    #[async_trait]
    impl Transcoder for CopyTranscoder {
        fn name(&self) -> &str {
            "copy"
        }

        async fn transcode(
            &self,
            job: TranscodeJob,
            _cancel: &CancellationToken,
        ) -> Result<TranscodeResult, TranscoderError> {
            let bytes = tokio::fs::copy(&job.input_path, &job.output_path).await?;
            Ok(TranscodeResult {
                job_id: job.job_id,
                output_path: job.output_path,
                output_size_bytes: bytes,
                duration_ms: 0,
            })
        }

        async fn validate(&self) -> Result<(), TranscoderError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_copy_transcoder() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        tokio::fs::write(&input, b"frames").await.unwrap();

        let job = TranscodeJob {
            job_id: "job-1".to_string(),
            input_path: input,
            output_path: dir.path().join("out.mp4"),
        };
        let result = CopyTranscoder
            .transcode(job, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.job_id, "job-1");
        assert_eq!(result.output_size_bytes, 6);
    }

    #[test]
    fn test_default_extension() {
        assert_eq!(CopyTranscoder.output_extension(), "mp4");
        assert_eq!(CopyTranscoder.name(), "copy");
    }
}
