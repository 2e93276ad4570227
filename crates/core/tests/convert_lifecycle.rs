//! Conversion lifecycle integration tests.
//!
//! These tests run the conversion engine against a local HTTP source and the
//! mock transcoder:
//! - State sequences for success and each failure kind
//! - Temp file cleanup on every exit path
//! - Cancellation during download and during transcode
//! - Truncated and stalled response bodies
//! - Admission control
//! - Engine and presenter together

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vidconv_core::{
    convert::{
        ConvertConfig, ConvertRequest, ConvertService, ConvertState, ConvertStatus, ConvertStream,
    },
    metrics::CONVERSION_DURATION,
    reply::{MessageRef, ReplyOutcome, ReplyPresenter, ReplyTemplates},
    testing::{MockChatTransport, MockTranscodeBehavior, MockTranscoder, TransportOp},
};

const SOURCE_BYTES: &[u8] = b"not really a webm, but the mock does not care";
const OUTPUT_BYTES: &[u8] = b"converted mp4";

/// Test helper wiring the engine to a mock HTTP source and mock transcoder.
struct TestHarness {
    service: ConvertService<MockTranscoder>,
    transcoder: Arc<MockTranscoder>,
    server: MockServer,
    storage: TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        Self::with_max_concurrent(4).await
    }

    async fn with_max_concurrent(max_concurrent: usize) -> Self {
        let storage = TempDir::new().expect("Failed to create storage dir");
        let transcoder = Arc::new(MockTranscoder::new());
        transcoder
            .set_behavior(MockTranscodeBehavior::Succeed(OUTPUT_BYTES.to_vec()))
            .await;

        let config = ConvertConfig::new(storage.path()).with_max_concurrent(max_concurrent);
        let service = ConvertService::new(config, Arc::clone(&transcoder))
            .expect("Failed to create service");

        Self {
            service,
            transcoder,
            server: MockServer::start().await,
            storage,
        }
    }

    async fn serve(&self, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    async fn serve_video(&self, route: &str) {
        self.serve(
            route,
            ResponseTemplate::new(200).set_body_raw(SOURCE_BYTES, "video/webm"),
        )
        .await;
    }

    fn request(&self, route: &str) -> ConvertRequest {
        ConvertRequest::new(format!("{}{}", self.server.uri(), route))
    }

    fn start(&self, route: &str) -> (ConvertStream, CancellationToken) {
        let cancel = CancellationToken::new();
        let stream = self.service.convert(cancel.clone(), self.request(route));
        (stream, cancel)
    }

    fn stored_files(&self) -> usize {
        count_files(self.storage.path())
    }
}

/// Serves a single response that announces more body than it sends. The
/// connection stays open after the partial body until `hold` fires.
async fn serve_partial_body(hold: CancellationToken) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        // Consume the whole request head so closing does not reset the connection.
        let mut request: Vec<u8> = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: video/webm\r\nContent-Length: {}\r\n\r\n",
            SOURCE_BYTES.len() * 4
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(SOURCE_BYTES).await.unwrap();
        socket.flush().await.unwrap();

        hold.cancelled().await;
    });

    format!("http://{}/partial.webm", addr)
}

async fn wait_for_stored_files(harness: &TestHarness, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while harness.stored_files() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("storage did not reach the expected file count");
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).expect("storage dir").count()
}

/// Receives every state until the stream closes.
async fn collect(mut stream: ConvertStream) -> Vec<ConvertState> {
    tokio::time::timeout(Duration::from_secs(10), async move {
        let mut states = Vec::new();
        while let Some(state) = stream.recv().await {
            states.push(state);
        }
        states
    })
    .await
    .expect("stream did not close")
}

async fn next_state(stream: &mut ConvertStream) -> Option<ConvertState> {
    tokio::time::timeout(Duration::from_secs(5), stream.recv())
        .await
        .expect("no state within timeout")
}

fn statuses(states: &[ConvertState]) -> Vec<ConvertStatus> {
    states.iter().map(|s| s.status()).collect()
}

#[tokio::test]
async fn test_video_is_downloaded_converted_and_handed_over() {
    let harness = TestHarness::new().await;
    harness.serve_video("/media/clip.webm").await;

    let (stream, _cancel) = harness.start("/media/clip.webm");
    let mut states = collect(stream).await;

    assert_eq!(
        statuses(&states),
        vec![
            ConvertStatus::Downloading,
            ConvertStatus::Converting,
            ConvertStatus::Done
        ]
    );

    // The transcoder saw the full download.
    let recorded = harness.transcoder.recorded_transcodes().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].input.as_deref(), Some(SOURCE_BYTES));
    assert!(!recorded[0].job.input_path.exists());

    // Only the produced file remains, and it belongs to the consumer now.
    assert_eq!(harness.stored_files(), 1);
    let done = states.pop().unwrap();
    assert!(done.error_message().is_none());
    let mut result = done.into_result().expect("done carries a result");
    assert_eq!(result.filename, "clip.mp4");

    let mut contents = Vec::new();
    result.data.read_to_end(&mut contents).await.unwrap();
    assert_eq!(contents, OUTPUT_BYTES);

    result.close().await.unwrap();
    assert_eq!(harness.stored_files(), 0);
}

#[tokio::test]
async fn test_octet_stream_is_accepted() {
    let harness = TestHarness::new().await;
    harness
        .serve(
            "/download",
            ResponseTemplate::new(200).set_body_raw(SOURCE_BYTES, "application/octet-stream"),
        )
        .await;

    let (stream, _cancel) = harness.start("/download");
    let states = collect(stream).await;

    assert_eq!(states.last().map(|s| s.status()), Some(ConvertStatus::Done));
    for state in states {
        state.cleanup().await.unwrap();
    }
    assert_eq!(harness.stored_files(), 0);
}

#[tokio::test]
async fn test_html_response_is_rejected() {
    let harness = TestHarness::new().await;
    harness
        .serve(
            "/page",
            ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html; charset=utf-8"),
        )
        .await;

    let (stream, _cancel) = harness.start("/page");
    let states = collect(stream).await;

    assert_eq!(
        statuses(&states),
        vec![ConvertStatus::Downloading, ConvertStatus::Error]
    );
    assert_eq!(states[1].error_message(), Some("unsupported format"));
    assert!(states[1].result().is_none());
    assert_eq!(harness.transcoder.transcode_count().await, 0);
    assert_eq!(harness.stored_files(), 0);
}

#[tokio::test]
async fn test_http_error_status_is_a_download_failure() {
    let harness = TestHarness::new().await;
    harness.serve("/gone", ResponseTemplate::new(404)).await;

    let (stream, _cancel) = harness.start("/gone");
    let states = collect(stream).await;

    assert_eq!(
        statuses(&states),
        vec![ConvertStatus::Downloading, ConvertStatus::Error]
    );
    assert_eq!(states[1].error_message(), Some("failed to download file"));
    assert_eq!(harness.stored_files(), 0);
}

#[tokio::test]
async fn test_transcode_failure_removes_source_and_target() {
    let harness = TestHarness::new().await;
    harness.serve_video("/media/clip.webm").await;
    harness
        .transcoder
        .set_behavior(MockTranscodeBehavior::Fail)
        .await;

    let (stream, _cancel) = harness.start("/media/clip.webm");
    let states = collect(stream).await;

    assert_eq!(
        statuses(&states),
        vec![
            ConvertStatus::Downloading,
            ConvertStatus::Converting,
            ConvertStatus::Error
        ]
    );
    assert_eq!(states[2].error_message(), Some("failed to convert file"));

    let recorded = harness.transcoder.recorded_transcodes().await;
    assert!(!recorded[0].job.input_path.exists());
    assert!(!recorded[0].job.output_path.exists());
    assert_eq!(harness.stored_files(), 0);
}

#[tokio::test]
async fn test_cancel_during_download_closes_stream() {
    let harness = TestHarness::new().await;
    harness
        .serve(
            "/slow.webm",
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(30))
                .set_body_raw(SOURCE_BYTES, "video/webm"),
        )
        .await;

    let (mut stream, cancel) = harness.start("/slow.webm");
    let first = next_state(&mut stream).await.expect("downloading state");
    assert_eq!(first.status(), ConvertStatus::Downloading);

    cancel.cancel();

    assert!(next_state(&mut stream).await.is_none());
    assert_eq!(harness.transcoder.transcode_count().await, 0);
    assert_eq!(harness.stored_files(), 0);
}

#[tokio::test]
async fn test_cancel_while_body_is_streaming_removes_partial_download() {
    let harness = TestHarness::new().await;
    let hold = CancellationToken::new();
    let url = serve_partial_body(hold.clone()).await;

    let cancel = CancellationToken::new();
    let mut stream = harness
        .service
        .convert(cancel.clone(), ConvertRequest::new(url));
    assert_eq!(
        next_state(&mut stream).await.map(|s| s.status()),
        Some(ConvertStatus::Downloading)
    );

    // The download file exists while the rest of the body is pending.
    wait_for_stored_files(&harness, 1).await;

    cancel.cancel();

    assert!(next_state(&mut stream).await.is_none());
    assert_eq!(harness.transcoder.transcode_count().await, 0);
    assert_eq!(harness.stored_files(), 0);
    hold.cancel();
}

#[tokio::test]
async fn test_truncated_body_is_a_download_failure() {
    let harness = TestHarness::new().await;
    let hold = CancellationToken::new();
    hold.cancel();
    let url = serve_partial_body(hold).await;

    let cancel = CancellationToken::new();
    let states = collect(harness.service.convert(cancel, ConvertRequest::new(url))).await;

    assert_eq!(
        statuses(&states),
        vec![ConvertStatus::Downloading, ConvertStatus::Error]
    );
    assert_eq!(states[1].error_message(), Some("failed to download file"));
    assert_eq!(harness.transcoder.transcode_count().await, 0);
    assert_eq!(harness.stored_files(), 0);
}

#[tokio::test]
async fn test_cancel_during_transcode_removes_partial_files() {
    let harness = TestHarness::new().await;
    harness.serve_video("/media/clip.webm").await;
    harness
        .transcoder
        .set_behavior(MockTranscodeBehavior::Hang)
        .await;

    let (mut stream, cancel) = harness.start("/media/clip.webm");
    assert_eq!(
        next_state(&mut stream).await.map(|s| s.status()),
        Some(ConvertStatus::Downloading)
    );
    assert_eq!(
        next_state(&mut stream).await.map(|s| s.status()),
        Some(ConvertStatus::Converting)
    );

    // Wait until the transcoder has written its partial output.
    tokio::time::timeout(Duration::from_secs(5), async {
        while harness.transcoder.transcode_count().await == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("transcode did not start");
    assert_eq!(harness.stored_files(), 2);

    cancel.cancel();

    assert!(next_state(&mut stream).await.is_none());
    assert_eq!(harness.stored_files(), 0);
}

#[tokio::test]
async fn test_abandoned_stream_releases_result() {
    let harness = TestHarness::new().await;
    harness.serve_video("/media/clip.webm").await;

    let (mut stream, _cancel) = harness.start("/media/clip.webm");
    assert_eq!(
        next_state(&mut stream).await.map(|s| s.status()),
        Some(ConvertStatus::Downloading)
    );
    assert_eq!(
        next_state(&mut stream).await.map(|s| s.status()),
        Some(ConvertStatus::Converting)
    );
    drop(stream);

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let done = harness.transcoder.transcode_count().await == 1;
            if done && harness.stored_files() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("files were not released");
}

#[tokio::test]
async fn test_admission_limit_holds_back_second_request() {
    let harness = TestHarness::with_max_concurrent(1).await;
    harness.serve_video("/a.webm").await;
    harness.serve_video("/b.webm").await;
    harness
        .transcoder
        .set_behavior(MockTranscodeBehavior::Hang)
        .await;

    let (mut first, first_cancel) = harness.start("/a.webm");
    assert_eq!(
        next_state(&mut first).await.map(|s| s.status()),
        Some(ConvertStatus::Downloading)
    );
    assert_eq!(
        next_state(&mut first).await.map(|s| s.status()),
        Some(ConvertStatus::Converting)
    );

    let (mut second, second_cancel) = harness.start("/b.webm");
    let waiting = tokio::time::timeout(Duration::from_millis(200), second.recv()).await;
    assert!(waiting.is_err(), "second request started before a permit was free");

    first_cancel.cancel();
    assert!(next_state(&mut first).await.is_none());

    assert_eq!(
        next_state(&mut second).await.map(|s| s.status()),
        Some(ConvertStatus::Downloading)
    );
    second_cancel.cancel();
    while next_state(&mut second).await.is_some() {}
    assert_eq!(harness.stored_files(), 0);
}

#[tokio::test]
async fn test_duration_includes_time_queued_for_admission() {
    let harness = TestHarness::with_max_concurrent(1).await;
    harness.serve_video("/a.webm").await;
    harness.serve_video("/b.webm").await;
    harness
        .transcoder
        .set_behavior(MockTranscodeBehavior::Hang)
        .await;

    let (mut first, first_cancel) = harness.start("/a.webm");
    assert_eq!(
        next_state(&mut first).await.map(|s| s.status()),
        Some(ConvertStatus::Downloading)
    );
    assert_eq!(
        next_state(&mut first).await.map(|s| s.status()),
        Some(ConvertStatus::Converting)
    );

    let cancelled = CONVERSION_DURATION.with_label_values(&["cancelled"]);
    let sum_before = cancelled.get_sample_sum();

    // Never admitted: cancelled while waiting for the only permit.
    let (mut second, second_cancel) = harness.start("/b.webm");
    tokio::time::sleep(Duration::from_millis(300)).await;
    second_cancel.cancel();
    assert!(next_state(&mut second).await.is_none());

    assert!(cancelled.get_sample_sum() - sum_before >= 0.3);

    first_cancel.cancel();
    assert!(next_state(&mut first).await.is_none());
    assert_eq!(harness.stored_files(), 0);
}

#[tokio::test]
async fn test_presenter_delivers_engine_result() {
    let harness = TestHarness::new().await;
    harness.serve_video("/media/clip.webm").await;
    let transport = Arc::new(MockChatTransport::new());
    let presenter = ReplyPresenter::new(Arc::clone(&transport), ReplyTemplates::default());

    let (stream, cancel) = harness.start("/media/clip.webm");
    let outcome = presenter
        .present(MessageRef::new(42, 10), stream, &cancel)
        .await;

    assert_eq!(outcome, ReplyOutcome::Delivered);
    let ops = transport.operations().await;
    let sends = ops
        .iter()
        .filter(|op| matches!(op, TransportOp::SendText { .. }))
        .count();
    assert_eq!(sends, 1);
    assert!(ops.contains(&TransportOp::SendFile {
        reply_to: 10,
        filename: "clip.mp4".to_string(),
        contents: OUTPUT_BYTES.to_vec(),
    }));
    assert_eq!(ops.last(), Some(&TransportOp::Delete { message_id: 1 }));
    assert_eq!(harness.stored_files(), 0);
}

#[tokio::test]
async fn test_presenter_reports_rejected_source() {
    let harness = TestHarness::new().await;
    harness
        .serve(
            "/page",
            ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"),
        )
        .await;
    let transport = Arc::new(MockChatTransport::new());
    let presenter = ReplyPresenter::new(Arc::clone(&transport), ReplyTemplates::default());

    let (stream, cancel) = harness.start("/page");
    let outcome = presenter
        .present(MessageRef::new(42, 10), stream, &cancel)
        .await;

    assert_eq!(outcome, ReplyOutcome::Failed);
    assert_eq!(
        transport.operations().await,
        vec![
            TransportOp::SendText {
                reply_to: 10,
                text: "Downloading file".to_string()
            },
            TransportOp::EditText {
                message_id: 1,
                text: "Error! unsupported format".to_string()
            },
        ]
    );
}
