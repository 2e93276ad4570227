//! Mock chat transport for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;

use crate::convert::DeleteOnCloseFile;
use crate::reply::{ChatTransport, DeliveryError, MessageId, MessageRef};

/// A successful transport call, recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    SendText {
        reply_to: MessageId,
        text: String,
    },
    EditText {
        message_id: MessageId,
        text: String,
    },
    SendFile {
        reply_to: MessageId,
        filename: String,
        contents: Vec<u8>,
    },
    Delete {
        message_id: MessageId,
    },
}

/// Which calls should fail.
#[derive(Debug, Clone, Copy, Default)]
struct FailureSwitches {
    send_text: bool,
    edit_text: bool,
    send_file: bool,
    delete: bool,
}

/// Mock implementation of the ChatTransport trait.
///
/// Records every successful call, hands out message ids starting at 1 and
/// can be told to fail any kind of call.
#[derive(Debug)]
pub struct MockChatTransport {
    ops: Arc<RwLock<Vec<TransportOp>>>,
    failures: Arc<RwLock<FailureSwitches>>,
    failed_calls: Arc<RwLock<usize>>,
    next_id: AtomicI64,
}

impl Default for MockChatTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChatTransport {
    /// Create a new mock transport where every call succeeds.
    pub fn new() -> Self {
        Self {
            ops: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(FailureSwitches::default())),
            failed_calls: Arc::new(RwLock::new(0)),
            next_id: AtomicI64::new(1),
        }
    }

    /// Get all recorded calls.
    pub async fn operations(&self) -> Vec<TransportOp> {
        self.ops.read().await.clone()
    }

    /// Number of calls that were made to fail.
    pub async fn failed_calls(&self) -> usize {
        *self.failed_calls.read().await
    }

    pub async fn set_fail_send_text(&self, fail: bool) {
        self.failures.write().await.send_text = fail;
    }

    pub async fn set_fail_edit_text(&self, fail: bool) {
        self.failures.write().await.edit_text = fail;
    }

    pub async fn set_fail_send_file(&self, fail: bool) {
        self.failures.write().await.send_file = fail;
    }

    pub async fn set_fail_delete(&self, fail: bool) {
        self.failures.write().await.delete = fail;
    }

    async fn check(&self, fail: bool, call: &str) -> Result<(), DeliveryError> {
        if fail {
            *self.failed_calls.write().await += 1;
            return Err(DeliveryError::Api(format!("{} failed (mock)", call)));
        }
        Ok(())
    }

    async fn record(&self, op: TransportOp) {
        self.ops.write().await.push(op);
    }
}

#[async_trait]
impl ChatTransport for MockChatTransport {
    async fn send_text_reply(
        &self,
        origin: &MessageRef,
        text: &str,
    ) -> Result<MessageId, DeliveryError> {
        let fail = self.failures.read().await.send_text;
        self.check(fail, "sendMessage").await?;

        self.record(TransportOp::SendText {
            reply_to: origin.message_id,
            text: text.to_string(),
        })
        .await;
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn edit_text(
        &self,
        _origin: &MessageRef,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), DeliveryError> {
        let fail = self.failures.read().await.edit_text;
        self.check(fail, "editMessageText").await?;

        self.record(TransportOp::EditText {
            message_id,
            text: text.to_string(),
        })
        .await;
        Ok(())
    }

    async fn send_file_reply(
        &self,
        origin: &MessageRef,
        filename: &str,
        data: &mut DeleteOnCloseFile,
    ) -> Result<(), DeliveryError> {
        let fail = self.failures.read().await.send_file;
        self.check(fail, "sendVideo").await?;

        let mut contents = Vec::new();
        data.read_to_end(&mut contents).await?;
        self.record(TransportOp::SendFile {
            reply_to: origin.message_id,
            filename: filename.to_string(),
            contents,
        })
        .await;
        Ok(())
    }

    async fn delete_message(
        &self,
        _origin: &MessageRef,
        message_id: MessageId,
    ) -> Result<(), DeliveryError> {
        let fail = self.failures.read().await.delete;
        self.check(fail, "deleteMessage").await?;

        self.record(TransportOp::Delete { message_id }).await;
        Ok(())
    }
}
