//! Conversion engine: download, validate, transcode and hand over a video.
//!
//! [`ConvertService::convert`] returns a [`ConvertStream`] right away and runs
//! the pipeline on its own task. The stream yields states strictly in
//! pipeline order:
//!
//! ```text
//! Downloading -> Converting -> Done
//!      |             |
//!      +-> Error     +-> Error
//! ```
//!
//! The channel has room for a single state, so a slow consumer holds the
//! producer back instead of queueing updates.
//!
//! # File ownership
//!
//! The engine owns every file it creates under the storage root. A `Done`
//! state transfers the produced file to the consumer as a
//! [`DeleteOnCloseFile`]; closing (or dropping) it deletes the file. Any other
//! exit path, including cancellation and an abandoned stream, removes the
//! engine's files before the stream closes.

mod config;
mod download;
mod error;
mod service;
mod stream;
mod temp;
mod types;

pub use config::ConvertConfig;
pub use download::{is_supported_media_type, loggable_url, parse_media_type};
pub use error::{
    ConvertError, PipelineStage, MSG_CHECK_FORMAT_FAILED, MSG_CONVERT_FAILED, MSG_DOWNLOAD_FAILED,
    MSG_READ_FAILED, MSG_UNSUPPORTED_FORMAT,
};
pub use service::ConvertService;
pub use stream::ConvertStream;
pub use temp::{DeleteOnCloseFile, TempPath};
pub use types::{ConvertRequest, ConvertResult, ConvertState, ConvertStatus};
