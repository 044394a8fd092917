use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use dashmap::DashMap;
use flexlink_error::ResourceError;
use tokio::sync::{broadcast, Notify};

use super::Subscription;
use crate::Message;

type ChannelKey = Arc<str>;

/// Sending side of one channel.
///
/// Every successful send wakes the tasks parked on [`waker`](Self::waker).
#[derive(Clone)]
pub struct ChannelSender {
    tx: broadcast::Sender<Message>,
    wake: Arc<Notify>,
}

impl ChannelSender {
    fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity).0,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Sends to every live receiver and returns how many were reached.
    pub fn send(
        &self,
        message: Message,
    ) -> Result<usize, broadcast::error::SendError<Message>> {
        let reached = self.tx.send(message)?;
        self.wake.notify_waiters();
        Ok(reached)
    }

    pub fn subscribe(
        &self,
        channel: Arc<str>,
    ) -> Subscription {
        Subscription::new(channel, self.tx.subscribe())
    }

    pub fn waker(&self) -> &Arc<Notify> {
        &self.wake
    }

    /// Whether both senders feed the same underlying channel.
    pub fn same_channel(
        &self,
        other: &ChannelSender,
    ) -> bool {
        self.tx.same_channel(&other.tx)
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// In-process pub/sub broker.
///
/// Supports:
/// - named channels created on first use
/// - publishing to every live receiver of a channel
/// - shutdown, after which no channel can be opened
/// - publish and failed send statistics
pub struct Broker {
    /// Channel name → `ChannelSender`
    channels: DashMap<ChannelKey, ChannelSender>,
    /// Buffer capacity of every `broadcast::channel`
    default_capacity: usize,
    shut_down: AtomicBool,
    /// Total number of `publish` calls
    pub publish_count: AtomicUsize,
    /// Publishes that reached no receiver
    pub send_error_count: AtomicUsize,
}

impl Broker {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            default_capacity: default_capacity.max(1),
            shut_down: AtomicBool::new(false),
            publish_count: AtomicUsize::new(0),
            send_error_count: AtomicUsize::new(0),
        }
    }

    /// Returns the sender of `channel`, creating the channel if needed.
    ///
    /// Fails with [`ResourceError::Unavailable`] after [`shutdown`](Self::shutdown).
    pub fn open(
        &self,
        channel: &str,
    ) -> Result<ChannelSender, ResourceError> {
        if self.is_shut_down() {
            return Err(ResourceError::Unavailable(format!(
                "broker is shut down, cannot open channel '{channel}'"
            )));
        }
        let tx = self
            .channels
            .entry(Arc::from(channel))
            .or_insert_with(|| ChannelSender::new(self.default_capacity))
            .clone();
        Ok(tx)
    }

    /// Current sender of `channel`, without creating it.
    pub fn sender(
        &self,
        channel: &str,
    ) -> Option<ChannelSender> {
        self.channels.get(channel).map(|e| e.value().clone())
    }

    /// Subscribes to `channel` (exact name).
    pub fn subscribe(
        &self,
        channel: &str,
    ) -> Result<Subscription, ResourceError> {
        let tx = self.open(channel)?;
        Ok(tx.subscribe(Arc::from(channel)))
    }

    /// Publishes `message` to `channel`.
    ///
    /// Returns the number of receivers reached. A channel that does not exist
    /// is not created; publishing into it or into a channel without receivers
    /// counts as a send error.
    pub fn publish(
        &self,
        channel: &str,
        message: Message,
    ) -> usize {
        self.publish_count.fetch_add(1, Ordering::Relaxed);

        let Some(tx) = self.sender(channel) else {
            self.send_error_count.fetch_add(1, Ordering::Relaxed);
            return 0;
        };
        match tx.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                self.send_error_count.fetch_add(1, Ordering::Relaxed);
                0
            }
        }
    }

    /// Removes `channel`; its receivers see `Closed` once every outstanding
    /// sender clone is dropped.
    ///
    /// A later [`open`](Self::open) of the same name creates a new channel.
    /// Holders of the old sender can tell through
    /// [`ChannelSender::same_channel`].
    pub fn close(
        &self,
        channel: &str,
    ) -> bool {
        match self.channels.remove(channel) {
            Some((_, tx)) => {
                tx.wake.notify_waiters();
                true
            }
            None => false,
        }
    }

    /// Closes every channel and refuses new ones.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        for entry in self.channels.iter() {
            entry.value().wake.notify_waiters();
        }
        self.channels.clear();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    pub fn contains(
        &self,
        channel: &str,
    ) -> bool {
        self.channels.contains_key(channel)
    }

    pub fn receiver_count(
        &self,
        channel: &str,
    ) -> usize {
        self.channels
            .get(channel)
            .map(|e| e.value().receiver_count())
            .unwrap_or(0)
    }

    pub fn channel_names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self.channels.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(1024)
    }
}
