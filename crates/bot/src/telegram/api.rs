//! Telegram Bot API HTTP client.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use super::types::{
    ApiResponse, BotInfo, DeleteMessageParams, EditMessageTextParams, GetFileParams,
    GetUpdatesParams, ReplyParameters, SendMessageParams, TgFile, TgMessage, Update,
};
use vidconv_core::config::TelegramConfig;

/// Headroom on top of the long-poll timeout before the HTTP call gives up.
const POLL_GRACE: Duration = Duration::from_secs(30);

/// Timeout for uploading a converted video.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Errors from calling the Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// The request failed or the response could not be decoded.
    #[error("{method} request failed: {source}")]
    Request {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with `ok: false`.
    #[error("{method} failed: {description}")]
    Rejected {
        method: &'static str,
        description: String,
    },

    /// The API answered `ok: true` without a result.
    #[error("{method} returned no result")]
    MissingResult { method: &'static str },

    /// The reply parameters could not be encoded for a multipart call.
    #[error("Failed to encode {method} parameters: {source}")]
    Encode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl TelegramError {
    /// Wraps a reqwest error for `method`, dropping the request URL since it
    /// contains the bot token.
    fn request(method: &'static str) -> impl Fn(reqwest::Error) -> Self {
        move |source| Self::Request {
            method,
            source: source.without_url(),
        }
    }
}

/// HTTP client for the Telegram Bot API.
pub struct TelegramApi {
    client: Client,
    base_url: String,
    file_base_url: String,
}

impl TelegramApi {
    /// Create a new API client from the bot configuration.
    pub fn new(config: &TelegramConfig) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.update_timeout_secs) + POLL_GRACE)
            .build()
            .map_err(TelegramError::request("client"))?;
        let api_url = config.api_url.trim_end_matches('/');
        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_url, config.token),
            file_base_url: format!("{}/file/bot{}", api_url, config.token),
        })
    }

    /// POSTs `params` as JSON to `method` and unwraps the API envelope.
    async fn call<P, R>(&self, method: &'static str, params: &P) -> Result<Option<R>, TelegramError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let resp: ApiResponse<R> = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(params)
            .send()
            .await
            .map_err(TelegramError::request(method))?
            .json()
            .await
            .map_err(TelegramError::request(method))?;

        if !resp.ok {
            return Err(TelegramError::Rejected {
                method,
                description: resp.description.unwrap_or_else(|| "unknown error".into()),
            });
        }
        Ok(resp.result)
    }

    /// Like [`call`](Self::call), for methods that always return a result.
    async fn call_for<P, R>(&self, method: &'static str, params: &P) -> Result<R, TelegramError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call(method, params)
            .await?
            .ok_or(TelegramError::MissingResult { method })
    }

    /// Verify the bot token by calling `getMe`.
    pub async fn get_me(&self) -> Result<BotInfo, TelegramError> {
        self.call_for("getMe", &serde_json::json!({})).await
    }

    /// Long-poll for updates.
    pub async fn get_updates(&self, params: &GetUpdatesParams) -> Result<Vec<Update>, TelegramError> {
        Ok(self.call("getUpdates", params).await?.unwrap_or_default())
    }

    /// Send a text message.
    pub async fn send_message(&self, params: &SendMessageParams) -> Result<TgMessage, TelegramError> {
        self.call_for("sendMessage", params).await
    }

    /// Edit an existing message's text.
    pub async fn edit_message_text(
        &self,
        params: &EditMessageTextParams,
    ) -> Result<(), TelegramError> {
        // The result is the edited message, or `true` for inline messages.
        self.call::<_, serde_json::Value>("editMessageText", params)
            .await
            .map(|_| ())
    }

    /// Delete a message.
    pub async fn delete_message(&self, params: &DeleteMessageParams) -> Result<(), TelegramError> {
        self.call::<_, bool>("deleteMessage", params)
            .await
            .map(|_| ())
    }

    /// Look up a file so it can be downloaded.
    pub async fn get_file(&self, file_id: &str) -> Result<TgFile, TelegramError> {
        let params = GetFileParams {
            file_id: file_id.to_string(),
        };
        self.call_for("getFile", &params).await
    }

    /// Direct download URL of a file returned by `getFile`.
    pub fn file_url(&self, file_path: &str) -> String {
        format!("{}/{}", self.file_base_url, file_path)
    }

    /// Upload a video as a reply, streaming it from `file`.
    pub async fn send_video(
        &self,
        chat_id: i64,
        reply_to: i64,
        filename: &str,
        file: File,
        size_bytes: u64,
    ) -> Result<TgMessage, TelegramError> {
        const METHOD: &str = "sendVideo";

        let reply_parameters = serde_json::to_string(&ReplyParameters::to(reply_to))
            .map_err(|source| TelegramError::Encode {
                method: METHOD,
                source,
            })?;
        let body = Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, size_bytes)
            .file_name(filename.to_string())
            .mime_str("video/mp4")
            .map_err(TelegramError::request(METHOD))?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("reply_parameters", reply_parameters)
            .text("supports_streaming", "true")
            .part("video", part);

        let resp: ApiResponse<TgMessage> = self
            .client
            .post(format!("{}/{}", self.base_url, METHOD))
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .await
            .map_err(TelegramError::request(METHOD))?
            .json()
            .await
            .map_err(TelegramError::request(METHOD))?;

        if !resp.ok {
            return Err(TelegramError::Rejected {
                method: METHOD,
                description: resp.description.unwrap_or_else(|| "unknown error".into()),
            });
        }
        resp.result.ok_or(TelegramError::MissingResult { method: METHOD })
    }
}
