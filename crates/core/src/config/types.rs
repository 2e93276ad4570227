use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::convert::ConvertConfig;
use crate::reply::ReplyTemplates;
use crate::transcoder::TranscoderConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub convert: ConvertConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    #[serde(default)]
    pub templates: ReplyTemplates,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    /// Bot token from BotFather
    pub token: String,
    /// Long-poll timeout for getUpdates in seconds (default: 30)
    #[serde(default = "default_update_timeout")]
    pub update_timeout_secs: u64,
    /// Bot API base URL (default: "https://api.telegram.org")
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_update_timeout() -> u64 {
    30
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// EnvFilter directives, used when RUST_LOG is unset (default: "info")
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

/// Metrics endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    9090
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub telegram: SanitizedTelegramConfig,
    pub convert: ConvertConfig,
    pub transcoder: TranscoderConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Sanitized Telegram config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTelegramConfig {
    pub token_configured: bool,
    pub update_timeout_secs: u64,
    pub api_url: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            telegram: SanitizedTelegramConfig {
                token_configured: !config.telegram.token.is_empty(),
                update_timeout_secs: config.telegram.update_timeout_secs,
                api_url: config.telegram.api_url.clone(),
            },
            convert: config.convert.clone(),
            transcoder: config.transcoder.clone(),
            logging: config.logging.clone(),
            metrics: config.metrics.clone(),
        }
    }
}
