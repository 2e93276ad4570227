//! Configuration for the convert module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the conversion engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Directory holding downloaded and transcoded temp files.
    pub storage_path: PathBuf,

    /// Conversions allowed to run at the same time. Further requests wait.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Timeout for the source download in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_max_concurrent() -> usize {
    4
}

fn default_request_timeout() -> u64 {
    600 // 10 minutes
}

impl ConvertConfig {
    /// Creates a config with default limits for the given storage root.
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            max_concurrent: default_max_concurrent(),
            request_timeout_secs: default_request_timeout(),
        }
    }

    /// Sets the concurrency limit.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }
}
