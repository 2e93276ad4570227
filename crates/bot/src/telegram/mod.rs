//! Telegram binding: Bot API client, long polling and the reply transport.
//!
//! Uses the Bot API with long polling (no webhook required).

pub mod api;
pub mod polling;
pub mod transport;
pub mod types;

pub use api::{TelegramApi, TelegramError};
pub use polling::run_polling_loop;
pub use transport::TelegramTransport;
