//! Turns inbound chat messages into conversion requests.
//!
//! Each message that carries a video, a document or a link gets its own task
//! running the conversion engine and the reply presenter side by side.

use std::sync::Arc;

use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vidconv_core::convert::{
    is_supported_media_type, parse_media_type, ConvertRequest, ConvertService, ConvertState,
    ConvertStream, MSG_DOWNLOAD_FAILED,
};
use vidconv_core::reply::{ChatTransport, MessageRef, ReplyPresenter};
use vidconv_core::transcoder::Transcoder;

use crate::metrics::MESSAGES_TOTAL;
use crate::telegram::types::TgMessage;
use crate::telegram::{run_polling_loop, TelegramApi};

/// Messages buffered between the polling loop and the dispatcher.
const MESSAGE_BUFFER: usize = 64;

/// Where the video of an inbound message lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundSource {
    /// A file uploaded to the chat, fetched through `getFile`.
    File {
        file_id: String,
        mime_type: Option<String>,
        kind: FileKind,
    },
    /// An http(s) link sent as the message text.
    Url(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Video,
    Document,
}

impl InboundSource {
    /// Metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File {
                kind: FileKind::Video,
                ..
            } => "video",
            Self::File {
                kind: FileKind::Document,
                ..
            } => "document",
            Self::Url(_) => "url",
        }
    }
}

/// Picks the source of a message: video, then document, then link text.
pub fn extract_source(msg: &TgMessage) -> Option<InboundSource> {
    if let Some(video) = &msg.video {
        return Some(InboundSource::File {
            file_id: video.file_id.clone(),
            mime_type: video.mime_type.clone(),
            kind: FileKind::Video,
        });
    }

    if let Some(document) = &msg.document {
        return Some(InboundSource::File {
            file_id: document.file_id.clone(),
            mime_type: document.mime_type.clone(),
            kind: FileKind::Document,
        });
    }

    msg.text.as_deref().and_then(parse_link).map(InboundSource::Url)
}

/// Accepts text that is exactly one absolute http(s) URL with a host.
fn parse_link(text: &str) -> Option<String> {
    let url = Url::parse(text.trim()).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url.to_string()),
        _ => None,
    }
}

/// Whether an attachment's declared MIME type allows a conversion attempt.
/// A missing declaration is left for the download to decide.
fn declared_as_video(mime_type: Option<&str>) -> bool {
    mime_type
        .and_then(parse_media_type)
        .map_or(true, |mt| is_supported_media_type(&mt))
}

/// Dispatches inbound messages to the conversion engine.
pub struct Controller<T: Transcoder, C: ChatTransport> {
    api: Arc<TelegramApi>,
    service: Arc<ConvertService<T>>,
    presenter: Arc<ReplyPresenter<C>>,
    update_timeout_secs: u64,
}

impl<T, C> Controller<T, C>
where
    T: Transcoder + 'static,
    C: ChatTransport + 'static,
{
    pub fn new(
        api: Arc<TelegramApi>,
        service: Arc<ConvertService<T>>,
        presenter: Arc<ReplyPresenter<C>>,
        update_timeout_secs: u64,
    ) -> Self {
        Self {
            api,
            service,
            presenter,
            update_timeout_secs,
        }
    }

    /// Polls for messages until `cancel` fires, then waits for every request
    /// task to wind down.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let (tx, mut rx) = mpsc::channel(MESSAGE_BUFFER);

        let poller = {
            let api = Arc::clone(&self.api);
            let timeout = self.update_timeout_secs;
            let cancel = cancel.child_token();
            tokio::spawn(async move { run_polling_loop(&api, timeout, tx, cancel).await })
        };

        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(msg) => {
                        let this = Arc::clone(&self);
                        let cancel = cancel.child_token();
                        tasks.spawn(async move { this.handle_message(msg, cancel).await });
                    }
                    // The polling loop only stops on cancellation.
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "Request task failed");
                    }
                }
            }
        }

        info!(in_flight = tasks.len(), "Waiting for requests to finish");
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Request task failed");
            }
        }
        if let Err(e) = poller.await {
            warn!(error = %e, "Polling task failed");
        }
    }

    /// Runs one message through the engine and presenter.
    pub async fn handle_message(&self, msg: TgMessage, cancel: CancellationToken) {
        let Some(source) = extract_source(&msg) else {
            MESSAGES_TOTAL.with_label_values(&["ignored"]).inc();
            debug!(
                chat_id = msg.chat.id,
                message_id = msg.message_id,
                "Message has nothing to convert"
            );
            return;
        };
        MESSAGES_TOTAL.with_label_values(&[source.as_str()]).inc();

        let origin = MessageRef::new(msg.chat.id, msg.message_id);
        info!(
            chat_id = origin.chat_id,
            message_id = origin.message_id,
            source = source.as_str(),
            "Handling conversion request"
        );

        let stream = self.open_stream(source, &cancel).await;
        let outcome = self.presenter.present(origin, stream, &cancel).await;
        info!(
            chat_id = origin.chat_id,
            message_id = origin.message_id,
            outcome = outcome.as_str(),
            "Request finished"
        );
    }

    async fn open_stream(&self, source: InboundSource, cancel: &CancellationToken) -> ConvertStream {
        let url = match source {
            InboundSource::Url(url) => url,
            InboundSource::File {
                file_id, mime_type, ..
            } => {
                if !declared_as_video(mime_type.as_deref()) {
                    debug!(file_id = %file_id, mime_type = ?mime_type, "Attachment is not a video");
                    return ConvertStream::from_states(vec![ConvertState::unsupported()]);
                }
                match self.resolve_file(&file_id).await {
                    Some(url) => url,
                    None => {
                        return ConvertStream::from_states(vec![ConvertState::error(
                            MSG_DOWNLOAD_FAILED,
                        )])
                    }
                }
            }
        };
        self.service.convert(cancel.clone(), ConvertRequest::new(url))
    }

    /// Direct download URL of an uploaded file.
    async fn resolve_file(&self, file_id: &str) -> Option<String> {
        match self.api.get_file(file_id).await {
            Ok(file) => match file.file_path {
                Some(path) => Some(self.api.file_url(&path)),
                None => {
                    warn!(file_id, "getFile returned no file_path");
                    None
                }
            },
            Err(e) => {
                warn!(file_id, error = %e, "Failed to resolve file");
                None
            }
        }
    }
}
