pub mod config;
pub mod convert;
pub mod metrics;
pub mod reply;
pub mod testing;
pub mod transcoder;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LogFormat,
    SanitizedConfig,
};
pub use convert::{
    ConvertConfig, ConvertError, ConvertRequest, ConvertResult, ConvertService, ConvertState,
    ConvertStatus, ConvertStream, DeleteOnCloseFile,
};
pub use reply::{
    ChatTransport, DeliveryError, MessageId, MessageRef, ReplyOutcome, ReplyPresenter,
    ReplyTemplates,
};
pub use transcoder::{FfmpegTranscoder, Transcoder, TranscoderConfig, TranscoderError};
