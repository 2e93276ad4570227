//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the transcoder and chat
//! transport traits, allowing the engine and presenter to be tested without
//! ffmpeg or a chat service.
//!
//! # Example
//!
//! ```rust,ignore
//! use vidconv_core::testing::{MockChatTransport, MockTranscoder};
//!
//! let transcoder = Arc::new(MockTranscoder::new());
//! let transport = Arc::new(MockChatTransport::new());
//!
//! // Configure mock behavior
//! transport.set_fail_send_file(true).await;
//!
//! // Wire into ConvertService / ReplyPresenter...
//! ```

mod mock_chat_transport;
mod mock_transcoder;

pub use mock_chat_transport::{MockChatTransport, TransportOp};
pub use mock_transcoder::{MockTranscodeBehavior, MockTranscoder, RecordedTranscode};
