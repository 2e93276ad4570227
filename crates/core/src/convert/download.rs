//! Streaming download of the source file into the storage root.

use std::path::Path;

use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::error::{ConvertError, PipelineStage};
use super::temp::TempPath;

/// Whether a media type names something the transcoder should accept.
///
/// `application/octet-stream` is let through since many hosts serve video
/// that way.
pub fn is_supported_media_type(media_type: &str) -> bool {
    media_type.starts_with("video/") || media_type == "application/octet-stream"
}

/// Extracts the bare, lowercased media type from a Content-Type value.
pub fn parse_media_type(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    if essence.is_empty() {
        None
    } else {
        Some(essence.to_ascii_lowercase())
    }
}

/// Short form of `url` safe to log: host and last path segment only.
///
/// Telegram file URLs carry the bot token in the path.
pub fn loggable_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return "<invalid url>".to_string();
    };
    let host = parsed.host_str().unwrap_or("<no host>");
    let last = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    if last.is_empty() {
        host.to_string()
    } else {
        format!("{}/.../{}", host, last)
    }
}

/// reqwest errors print the request URL, which may hold a token.
fn network_error(e: reqwest::Error) -> ConvertError {
    ConvertError::network(e.without_url().to_string())
}

/// Downloads `url` into a fresh temp file under `storage_root`.
///
/// The content type is checked before any bytes are written. The returned
/// guard owns the downloaded file; on any error the partial file is removed.
pub async fn download_source(
    client: &Client,
    url: &str,
    storage_root: &Path,
) -> Result<TempPath, ConvertError> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(network_error)?;

    let media_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_media_type);

    match media_type.as_deref() {
        Some(mt) if is_supported_media_type(mt) => {}
        _ => return Err(ConvertError::UnsupportedFormat { media_type }),
    }

    let source = TempPath::generate(storage_root, None);
    let file = File::create(source.path())
        .await
        .map_err(|e| ConvertError::storage(PipelineStage::Download, e))?;
    let mut writer = BufWriter::new(file);

    let mut body = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(network_error)?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| ConvertError::storage(PipelineStage::Download, e))?;
        written += chunk.len() as u64;
    }
    writer
        .flush()
        .await
        .map_err(|e| ConvertError::storage(PipelineStage::Download, e))?;

    debug!(url = %loggable_url(url), bytes = written, path = %source.path().display(), "Downloaded source");
    Ok(source)
}
