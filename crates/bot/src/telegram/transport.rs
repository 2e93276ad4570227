//! `ChatTransport` over the Telegram Bot API.

use std::sync::Arc;

use async_trait::async_trait;

use super::api::{TelegramApi, TelegramError};
use super::types::{DeleteMessageParams, EditMessageTextParams, ReplyParameters, SendMessageParams};
use vidconv_core::convert::DeleteOnCloseFile;
use vidconv_core::reply::{ChatTransport, DeliveryError, MessageId, MessageRef};

impl From<TelegramError> for DeliveryError {
    fn from(err: TelegramError) -> Self {
        match err {
            TelegramError::Rejected { .. } | TelegramError::MissingResult { .. } => {
                DeliveryError::Api(err.to_string())
            }
            TelegramError::Request { .. } | TelegramError::Encode { .. } => {
                DeliveryError::Transport(err.to_string())
            }
        }
    }
}

/// Sends replies through a shared [`TelegramApi`].
pub struct TelegramTransport {
    api: Arc<TelegramApi>,
}

impl TelegramTransport {
    pub fn new(api: Arc<TelegramApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text_reply(
        &self,
        origin: &MessageRef,
        text: &str,
    ) -> Result<MessageId, DeliveryError> {
        let sent = self
            .api
            .send_message(&SendMessageParams {
                chat_id: origin.chat_id,
                text: text.to_string(),
                reply_parameters: Some(ReplyParameters::to(origin.message_id)),
            })
            .await?;
        Ok(sent.message_id)
    }

    async fn edit_text(
        &self,
        origin: &MessageRef,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), DeliveryError> {
        self.api
            .edit_message_text(&EditMessageTextParams {
                chat_id: origin.chat_id,
                message_id,
                text: text.to_string(),
            })
            .await?;
        Ok(())
    }

    async fn send_file_reply(
        &self,
        origin: &MessageRef,
        filename: &str,
        data: &mut DeleteOnCloseFile,
    ) -> Result<(), DeliveryError> {
        let size_bytes = data.size_bytes().await?;
        let file = data.try_clone_file().await?;
        self.api
            .send_video(origin.chat_id, origin.message_id, filename, file, size_bytes)
            .await?;
        Ok(())
    }

    async fn delete_message(
        &self,
        origin: &MessageRef,
        message_id: MessageId,
    ) -> Result<(), DeliveryError> {
        self.api
            .delete_message(&DeleteMessageParams {
                chat_id: origin.chat_id,
                message_id,
            })
            .await?;
        Ok(())
    }
}
