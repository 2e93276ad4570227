//! FFmpeg-based transcoder implementation.

use async_trait::async_trait;
use regex_lite::Regex;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::TranscoderConfig;
use super::error::TranscoderError;
use super::traits::Transcoder;
use super::types::{TranscodeJob, TranscodeProgress, TranscodeResult};

/// Minimum time between two progress log lines for one job.
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// FFmpeg-based transcoder producing MP4 files.
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
    time_regex: Option<Regex>,
    speed_regex: Option<Regex>,
}

impl FfmpegTranscoder {
    /// Creates a new FFmpeg transcoder with the given configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self {
            config,
            time_regex: Regex::new(r"out_time_ms=(\d+)").ok(),
            speed_regex: Regex::new(r"speed=\s*(\d+\.?\d*)x").ok(),
        }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscoderConfig::default())
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &TranscoderConfig {
        &self.config
    }

    /// Builds ffmpeg arguments for an MP4 transcode.
    fn build_args(&self, input_path: &Path, output_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // Overwrite output
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
        ];

        // Video codec
        args.extend(["-c:v".to_string(), self.config.video_codec.clone()]);
        if let Some(crf) = self.config.crf {
            args.extend(["-crf".to_string(), crf.to_string()]);
        }
        // Most players only decode 4:2:0 H.264
        args.extend(["-pix_fmt".to_string(), "yuv420p".to_string()]);

        // Audio codec
        args.extend(["-c:a".to_string(), self.config.audio_codec.clone()]);

        // Put the moov atom first so chat clients can stream the result
        args.extend(["-movflags".to_string(), "+faststart".to_string()]);

        // Log level and progress
        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ]);

        // Extra args
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        // Output
        args.push(output_path.to_string_lossy().to_string());

        args
    }

    /// Applies one line of ffmpeg `-progress` output to `progress`.
    ///
    /// Returns true if the line carried progress information.
    fn parse_progress_line(&self, line: &str, progress: &mut TranscodeProgress) -> bool {
        let mut matched = false;

        if let Some(ref re) = self.time_regex {
            if let Some(us) = re
                .captures(line)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok())
            {
                // ffmpeg reports microseconds despite the key name
                progress.time_secs = us / 1_000_000.0;
                matched = true;
            }
        }

        if let Some(ref re) = self.speed_regex {
            if let Some(speed) = re.captures(line).and_then(|caps| caps.get(1)) {
                progress.speed = Some(format!("{}x", speed.as_str()));
                matched = true;
            }
        }

        matched
    }

    /// Runs ffmpeg for the job, honouring the timeout and the cancellation token.
    async fn run_transcode(
        &self,
        job: &TranscodeJob,
        cancel: &CancellationToken,
    ) -> Result<TranscodeResult, TranscoderError> {
        let start = Instant::now();

        if !tokio::fs::try_exists(&job.input_path).await.unwrap_or(false) {
            return Err(TranscoderError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        let args = self.build_args(&job.input_path, &job.output_path);
        debug!(job_id = %job.job_id, ?args, "Spawning ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscoderError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TranscoderError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TranscoderError::conversion_failed("ffmpeg stderr not captured", None))?;
        let mut reader = BufReader::new(stderr).lines();

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let run = async {
            let mut progress = TranscodeProgress::default();
            let mut last_progress_log = Instant::now();
            let mut error_output = String::new();

            while let Ok(Some(line)) = reader.next_line().await {
                // Capture error output
                if line.contains("Error") || line.contains("error") {
                    error_output.push_str(&line);
                    error_output.push('\n');
                }

                if self.parse_progress_line(&line, &mut progress)
                    && last_progress_log.elapsed() >= PROGRESS_LOG_INTERVAL
                {
                    debug!(
                        job_id = %job.job_id,
                        time_secs = progress.time_secs,
                        speed = progress.speed.as_deref().unwrap_or("?"),
                        "Transcode progress"
                    );
                    last_progress_log = Instant::now();
                }
            }

            // Wait for process to complete
            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, String), std::io::Error>((status, error_output))
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = timeout(timeout_duration, run) => Some(result),
        };

        match outcome {
            None => {
                debug!(job_id = %job.job_id, "Transcode cancelled, killing ffmpeg");
                let _ = child.kill().await;
                return Err(TranscoderError::Cancelled);
            }
            Some(Ok(Ok((status, error_output)))) => {
                if !status.success() {
                    return Err(TranscoderError::conversion_failed(
                        format!("FFmpeg exited with code: {:?}", status.code()),
                        if error_output.is_empty() {
                            None
                        } else {
                            Some(error_output)
                        },
                    ));
                }
            }
            Some(Ok(Err(e))) => return Err(TranscoderError::Io(e)),
            Some(Err(_)) => {
                // Kill the process on timeout
                warn!(job_id = %job.job_id, "Transcode timed out, killing ffmpeg");
                let _ = child.kill().await;
                return Err(TranscoderError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        // Verify output exists and get size
        let output_meta = tokio::fs::metadata(&job.output_path)
            .await
            .map_err(|_| TranscoderError::conversion_failed("Output file not created", None))?;

        Ok(TranscodeResult {
            job_id: job.job_id.clone(),
            output_path: job.output_path.clone(),
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn transcode(
        &self,
        job: TranscodeJob,
        cancel: &CancellationToken,
    ) -> Result<TranscodeResult, TranscoderError> {
        self.run_transcode(&job, cancel).await
    }

    async fn validate(&self) -> Result<(), TranscoderError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscoderError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TranscoderError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(TranscoderError::conversion_failed(
                "ffmpeg -version failed",
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
            ));
        }

        Ok(())
    }
}
