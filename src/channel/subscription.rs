use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{
    error::{RecvError, TryRecvError},
    Message,
};

/// Subscription to one named channel.
///
/// Dropping it unsubscribes.
pub struct Subscription {
    pub channel: Arc<str>,
    pub(crate) inner: broadcast::Receiver<Message>,
}

impl Subscription {
    pub(crate) fn new(
        channel: Arc<str>,
        inner: broadcast::Receiver<Message>,
    ) -> Self {
        Self { channel, inner }
    }

    /// Waits for the next message.
    ///
    /// # Returns
    /// - `Err(RecvError::Closed)` once every sender is gone
    /// - `Err(RecvError::Lagged(n))` when `n` messages were overwritten
    pub async fn recv(&mut self) -> Result<Message, RecvError> {
        self.inner.recv().await.map_err(Into::into)
    }

    pub fn try_recv(&mut self) -> Result<Message, TryRecvError> {
        self.inner.try_recv().map_err(Into::into)
    }

    pub fn channel_name(&self) -> &Arc<str> {
        &self.channel
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Messages queued for this receiver.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
