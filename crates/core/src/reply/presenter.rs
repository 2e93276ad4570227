//! Renders one request's state stream into a single evolving reply.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::templates::ReplyTemplates;
use super::transport::{ChatTransport, MessageId, MessageRef};
use crate::convert::{ConvertResult, ConvertStatus, ConvertStream};
use crate::metrics::DELIVERIES_TOTAL;

/// How a presentation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The converted file was sent.
    Delivered,
    /// The request ended in `Error`/`Unsupported`, or the file could not be
    /// sent.
    Failed,
    /// The stream closed without a terminal state or the token fired.
    Abandoned,
}

impl ReplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        }
    }
}

/// The message being edited for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyHandle {
    pub message_id: Option<MessageId>,
}

/// Presents conversion progress through a [`ChatTransport`].
pub struct ReplyPresenter<T: ChatTransport> {
    transport: Arc<T>,
    templates: ReplyTemplates,
}

impl<T: ChatTransport> ReplyPresenter<T> {
    pub fn new(transport: Arc<T>, templates: ReplyTemplates) -> Self {
        Self {
            transport,
            templates,
        }
    }

    pub fn templates(&self) -> &ReplyTemplates {
        &self.templates
    }

    /// Consumes `stream` until it closes, mirroring every state into one
    /// reply to `origin`.
    ///
    /// Delivery failures are logged and never stop consumption. The result of
    /// a `Done` state is always closed before this returns.
    pub async fn present(
        &self,
        origin: MessageRef,
        mut stream: ConvertStream,
        cancel: &CancellationToken,
    ) -> ReplyOutcome {
        let mut handle = ReplyHandle::default();
        let mut outcome = None;

        loop {
            let state = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                state = stream.recv() => match state {
                    Some(state) => state,
                    None => break,
                },
            };

            let status = state.status();
            let text = self.templates.render(&state);
            self.show(&origin, &mut handle, &text).await;

            match status {
                ConvertStatus::Done => {
                    if let Some(result) = state.into_result() {
                        outcome = Some(self.deliver(&origin, &mut handle, result, cancel).await);
                    }
                }
                ConvertStatus::Error | ConvertStatus::Unsupported => {
                    outcome = Some(ReplyOutcome::Failed);
                }
                ConvertStatus::Downloading | ConvertStatus::Converting => {}
            }
        }

        let outcome = outcome.unwrap_or(ReplyOutcome::Abandoned);
        DELIVERIES_TOTAL.with_label_values(&[outcome.as_str()]).inc();
        debug!(
            chat_id = origin.chat_id,
            message_id = origin.message_id,
            outcome = outcome.as_str(),
            "Reply finished"
        );
        outcome
    }

    /// Sends the first reply or edits the existing one.
    async fn show(&self, origin: &MessageRef, handle: &mut ReplyHandle, text: &str) {
        match handle.message_id {
            None => match self.transport.send_text_reply(origin, text).await {
                Ok(id) => handle.message_id = Some(id),
                Err(e) => warn!(chat_id = origin.chat_id, error = %e, "Failed to send reply"),
            },
            Some(id) => {
                if let Err(e) = self.transport.edit_text(origin, id, text).await {
                    warn!(chat_id = origin.chat_id, message_id = id, error = %e, "Failed to edit reply");
                }
            }
        }
    }

    /// Sends the converted file, then removes the progress message.
    async fn deliver(
        &self,
        origin: &MessageRef,
        handle: &mut ReplyHandle,
        mut result: ConvertResult,
        cancel: &CancellationToken,
    ) -> ReplyOutcome {
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            sent = self.transport.send_file_reply(origin, &result.filename, &mut result.data) => Some(sent),
        };

        let outcome = match sent {
            Some(Ok(())) => {
                if let Some(id) = handle.message_id.take() {
                    if let Err(e) = self.transport.delete_message(origin, id).await {
                        warn!(chat_id = origin.chat_id, message_id = id, error = %e, "Failed to delete progress message");
                    }
                }
                ReplyOutcome::Delivered
            }
            // Keep the progress message so the chat still shows what happened.
            Some(Err(e)) => {
                warn!(chat_id = origin.chat_id, filename = %result.filename, error = %e, "Failed to send converted file");
                ReplyOutcome::Failed
            }
            None => ReplyOutcome::Abandoned,
        };

        if let Err(e) = result.close().await {
            warn!(error = %e, "Failed to remove converted file");
        }
        outcome
    }
}
