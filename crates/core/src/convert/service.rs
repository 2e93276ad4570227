//! The conversion engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, Url};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::ConvertConfig;
use super::download::{download_source, loggable_url};
use super::error::{ConvertError, PipelineStage};
use super::stream::{ConvertStream, StatePusher};
use super::temp::{DeleteOnCloseFile, TempPath};
use super::types::{ConvertRequest, ConvertResult, ConvertState};
use crate::metrics::{CONVERSIONS_ACTIVE, CONVERSIONS_TOTAL, CONVERSION_DURATION};
use crate::transcoder::{TranscodeJob, Transcoder};

/// Runs download → transcode → finalize pipelines, one task per request.
pub struct ConvertService<T: Transcoder> {
    config: ConvertConfig,
    transcoder: Arc<T>,
    client: Client,
    admission: Arc<Semaphore>,
}

impl<T: Transcoder + 'static> ConvertService<T> {
    /// Creates a new service with its own HTTP client.
    pub fn new(config: ConvertConfig, transcoder: Arc<T>) -> Result<Self, ConvertError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConvertError::network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(config, transcoder, client))
    }

    /// Creates a new service using the given HTTP client.
    pub fn with_client(config: ConvertConfig, transcoder: Arc<T>, client: Client) -> Self {
        let admission = Arc::new(Semaphore::new(config.max_concurrent));
        Self {
            config,
            transcoder,
            client,
            admission,
        }
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Starts converting `request` and returns its state stream immediately.
    ///
    /// The stream ends after the terminal state, or without one once `cancel`
    /// fires. Either way every temp file the pipeline created and did not hand
    /// over is removed before the stream closes.
    pub fn convert(&self, cancel: CancellationToken, request: ConvertRequest) -> ConvertStream {
        let (pusher, stream) = ConvertStream::channel();
        let pipeline = Pipeline {
            request_id: Uuid::new_v4().to_string(),
            storage_root: self.config.storage_path.clone(),
            transcoder: Arc::clone(&self.transcoder),
            client: self.client.clone(),
            admission: Arc::clone(&self.admission),
        };
        tokio::spawn(pipeline.run(cancel, request, pusher));
        stream
    }
}

/// Everything one pipeline run needs, owned by its task.
struct Pipeline<T: Transcoder> {
    request_id: String,
    storage_root: PathBuf,
    transcoder: Arc<T>,
    client: Client,
    admission: Arc<Semaphore>,
}

impl<T: Transcoder> Pipeline<T> {
    async fn run(self, cancel: CancellationToken, request: ConvertRequest, pusher: StatePusher) {
        let start = Instant::now();
        info!(
            request_id = %self.request_id,
            url = %loggable_url(&request.source_url),
            "Conversion requested"
        );

        // Losing the race drops `execute`, and with it every temp file guard,
        // before `pusher` goes away and the stream closes.
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ConvertError::Cancelled),
            result = self.execute(&request, &pusher, &cancel) => result,
        };

        let label = match &outcome {
            Ok(()) => "done",
            Err(e) => e.kind(),
        };
        CONVERSIONS_TOTAL.with_label_values(&[label]).inc();
        CONVERSION_DURATION
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());

        match outcome {
            Ok(()) => info!(
                request_id = %self.request_id,
                duration_ms = start.elapsed().as_millis() as u64,
                "Conversion finished"
            ),
            Err(e) if e.is_cancellation() => {
                info!(request_id = %self.request_id, reason = %e, "Conversion stopped")
            }
            Err(e) => warn!(request_id = %self.request_id, error = %e, "Conversion failed"),
        }
        drop(pusher);
    }

    async fn execute(
        &self,
        request: &ConvertRequest,
        pusher: &StatePusher,
        cancel: &CancellationToken,
    ) -> Result<(), ConvertError> {
        let _permit = self
            .admission
            .acquire()
            .await
            .map_err(|_| ConvertError::Cancelled)?;
        let _active = ActiveConversion::start();

        // Stage 1: download
        pusher.push(ConvertState::downloading()).await?;
        let source =
            match download_source(&self.client, &request.source_url, &self.storage_root).await {
                Ok(source) => source,
                Err(e) => return fail(pusher, e).await,
            };

        // Stage 2: transcode
        pusher.push(ConvertState::converting()).await?;
        let target = TempPath::generate(&self.storage_root, Some(self.transcoder.output_extension()));
        let job = TranscodeJob {
            job_id: self.request_id.clone(),
            input_path: source.path().to_path_buf(),
            output_path: target.path().to_path_buf(),
        };
        let transcoded = self.transcoder.transcode(job, cancel).await;

        if let Err(e) = source.remove().await {
            warn!(request_id = %self.request_id, error = %e, "Failed to remove downloaded file");
        }

        let result = match transcoded {
            Ok(result) => result,
            Err(e) => {
                if let Err(remove_err) = target.remove().await {
                    warn!(request_id = %self.request_id, error = %remove_err, "Failed to remove partial output");
                }
                return fail(pusher, e.into()).await;
            }
        };
        debug!(
            request_id = %self.request_id,
            transcoder = self.transcoder.name(),
            output_size_bytes = result.output_size_bytes,
            duration_ms = result.duration_ms,
            "Transcode finished"
        );

        // Stage 3: finalize
        let data = match DeleteOnCloseFile::open(target).await {
            Ok(data) => data,
            Err(e) => return fail(pusher, ConvertError::storage(PipelineStage::Finalize, e)).await,
        };
        let filename = result_filename(&request.source_url, data.path());
        pusher
            .push(ConvertState::done(ConvertResult { filename, data }))
            .await
    }
}

/// Reports `error` as the terminal state, unless it is a cancellation, which
/// ends the stream silently.
async fn fail(pusher: &StatePusher, error: ConvertError) -> Result<(), ConvertError> {
    if !error.is_cancellation()
        && pusher
            .push(ConvertState::error(error.user_message()))
            .await
            .is_err()
    {
        debug!(error = %error, "Consumer gone before the error could be reported");
    }
    Err(error)
}

/// Name to present the converted file under: the last path segment of the
/// source URL with its extension replaced, or the generated name.
fn result_filename(source_url: &str, produced: &Path) -> String {
    let extension = produced
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4");

    let stem = Url::parse(source_url).ok().and_then(|url| {
        let segment = url.path_segments()?.next_back()?.to_string();
        let stem = Path::new(&segment).file_stem()?.to_str()?.to_string();
        (!stem.is_empty()).then_some(stem)
    });

    match stem {
        Some(stem) => format!("{}.{}", stem, extension),
        None => produced
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("video.{}", extension)),
    }
}

/// Keeps the active-conversions gauge in step with held permits.
struct ActiveConversion;

impl ActiveConversion {
    fn start() -> Self {
        CONVERSIONS_ACTIVE.inc();
        Self
    }
}

impl Drop for ActiveConversion {
    fn drop(&mut self) {
        CONVERSIONS_ACTIVE.dec();
    }
}
