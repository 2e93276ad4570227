//! Per-status reply texts.

use serde::{Deserialize, Serialize};

use crate::convert::{ConvertState, ConvertStatus};

/// Placeholder in the error template replaced by the error message.
pub const MESSAGE_PLACEHOLDER: &str = "{message}";

/// One text template per [`ConvertStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTemplates {
    #[serde(default = "default_unsupported")]
    pub unsupported: String,
    #[serde(default = "default_downloading")]
    pub downloading: String,
    #[serde(default = "default_converting")]
    pub converting: String,
    #[serde(default = "default_done")]
    pub done: String,
    /// May contain `{message}`.
    #[serde(default = "default_error")]
    pub error: String,
}

fn default_unsupported() -> String {
    "Unsupported file".to_string()
}

fn default_downloading() -> String {
    "Downloading file".to_string()
}

fn default_converting() -> String {
    "Converting file to mp4".to_string()
}

fn default_done() -> String {
    "Uploading file".to_string()
}

fn default_error() -> String {
    "Error! {message}".to_string()
}

impl Default for ReplyTemplates {
    fn default() -> Self {
        Self {
            unsupported: default_unsupported(),
            downloading: default_downloading(),
            converting: default_converting(),
            done: default_done(),
            error: default_error(),
        }
    }
}

impl ReplyTemplates {
    /// The raw template for `status`.
    pub fn template(&self, status: ConvertStatus) -> &str {
        match status {
            ConvertStatus::Unsupported => &self.unsupported,
            ConvertStatus::Downloading => &self.downloading,
            ConvertStatus::Converting => &self.converting,
            ConvertStatus::Done => &self.done,
            ConvertStatus::Error => &self.error,
        }
    }

    /// Renders `state` to plain text.
    pub fn render(&self, state: &ConvertState) -> String {
        let template = self.template(state.status());
        match state.error_message() {
            Some(message) => template.replace(MESSAGE_PLACEHOLDER, message),
            None => template.to_string(),
        }
    }
}
