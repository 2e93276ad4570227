//! The ordered state stream handed to consumers.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use super::error::ConvertError;
use super::types::ConvertState;

/// Receiving end of one conversion's states.
///
/// States arrive in pipeline order and the stream ends after the terminal
/// state. Dropping it tells the producer nobody is listening anymore; any
/// result it was about to hand over is cleaned up by the producer.
#[derive(Debug)]
pub struct ConvertStream {
    rx: mpsc::Receiver<ConvertState>,
}

impl ConvertStream {
    /// Creates a connected pusher/stream pair.
    ///
    /// Capacity 1 keeps the producer at most one state ahead of the consumer.
    pub(crate) fn channel() -> (StatePusher, Self) {
        let (tx, rx) = mpsc::channel(1);
        (StatePusher { tx }, Self { rx })
    }

    /// A stream that yields the given states and then ends.
    pub fn from_states(states: Vec<ConvertState>) -> Self {
        let (tx, rx) = mpsc::channel(states.len().max(1));
        for state in states {
            // Capacity covers every state, so this cannot fail.
            let _ = tx.try_send(state);
        }
        Self { rx }
    }

    /// Receives the next state, or `None` once the stream is finished.
    pub async fn recv(&mut self) -> Option<ConvertState> {
        self.rx.recv().await
    }
}

impl Stream for ConvertStream {
    type Item = ConvertState;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Producer side of a [`ConvertStream`].
#[derive(Debug)]
pub(crate) struct StatePusher {
    tx: mpsc::Sender<ConvertState>,
}

impl StatePusher {
    /// Pushes a state, waiting until the consumer has room for it.
    ///
    /// If the consumer is gone the state is dropped, which releases any file
    /// it carries.
    pub(crate) async fn push(&self, state: ConvertState) -> Result<(), ConvertError> {
        self.tx.send(state).await.map_err(|_| ConvertError::Abandoned)
    }
}
