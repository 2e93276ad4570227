//! Chat transport seam used by the presenter.

use async_trait::async_trait;
use thiserror::Error;

use crate::convert::DeleteOnCloseFile;

/// Identifier of a message within its chat.
pub type MessageId = i64;

/// A message in a chat, used as the origin replies are linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: MessageId,
}

impl MessageRef {
    pub fn new(chat_id: i64, message_id: MessageId) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }
}

/// Errors from delivering a reply.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The chat service rejected the call.
    #[error("API error: {0}")]
    Api(String),

    /// The call did not reach the chat service or its response was unreadable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Reading the attachment failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The outbound operations the presenter needs from a chat service.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends `text` as a reply to `origin` and returns the new message's id.
    async fn send_text_reply(
        &self,
        origin: &MessageRef,
        text: &str,
    ) -> Result<MessageId, DeliveryError>;

    /// Replaces the text of a previously sent message.
    async fn edit_text(
        &self,
        origin: &MessageRef,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), DeliveryError>;

    /// Uploads `data` as a file reply to `origin`.
    ///
    /// The handle stays owned by the caller, who closes it afterwards.
    async fn send_file_reply(
        &self,
        origin: &MessageRef,
        filename: &str,
        data: &mut DeleteOnCloseFile,
    ) -> Result<(), DeliveryError>;

    /// Deletes a message in the origin's chat.
    async fn delete_message(
        &self,
        origin: &MessageRef,
        message_id: MessageId,
    ) -> Result<(), DeliveryError>;
}
