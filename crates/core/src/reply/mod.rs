//! Reply presenter: one evolving chat reply per conversion request.
//!
//! The first state is sent as a reply to the user's message, later states
//! edit that reply in place, and a `Done` state is followed by the converted
//! file as an attachment and the removal of the progress message.
//!
//! ```text
//! NoReply --first state--> Replying --Done--> Delivered
//!                             |
//!                             +--Error/Unsupported--> Failed
//! ```
//!
//! A stream that closes without a terminal state, or a fired cancellation
//! token, ends the presentation as `Abandoned`.

mod presenter;
mod templates;
mod transport;

pub use presenter::{ReplyHandle, ReplyOutcome, ReplyPresenter};
pub use templates::{ReplyTemplates, MESSAGE_PLACEHOLDER};
pub use transport::{ChatTransport, DeliveryError, MessageId, MessageRef};
