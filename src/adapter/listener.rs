use std::sync::Arc;

use flexlink_error::ResourceError;
use parking_lot::Mutex;
use tokio::{runtime::Handle, sync::Notify, task::JoinHandle};

use crate::{
    channel::{Broker, ChannelSender, Subscription},
    error::TryRecvError,
    lifecycle::{ListenerResourceFactory, ListenerResourceHandle},
    Message,
};

/// Messages forwarded per wake-up before the listener yields to the runtime.
const DRAIN_BATCH: usize = 64;

/// Receives every message a running listener pulls off its channel.
pub trait MessageSink: Send + Sync {
    fn deliver(
        &self,
        destination: &Arc<str>,
        message: Message,
    );
}

/// Creates [`ChannelListener`]s for one destination bound to one channel.
pub struct ChannelListenerFactory {
    broker: Arc<Broker>,
    channel: Arc<str>,
    destination: Arc<str>,
    sink: Arc<dyn MessageSink>,
    runtime: Handle,
}

/// Receiver slot shared by a listener and its forwarding task.
///
/// Emptying it detaches the listener from the channel at once, whatever the
/// task is doing.
type Slot = Arc<Mutex<Option<Subscription>>>;

/// Listener consuming a broker channel.
///
/// Initialized while it holds a sender of the channel currently registered
/// under its name; running while its receiver slot is filled.
pub struct ChannelListener {
    broker: Arc<Broker>,
    channel: Arc<str>,
    destination: Arc<str>,
    sender: Option<ChannelSender>,
    sink: Arc<dyn MessageSink>,
    runtime: Handle,
    slot: Option<Slot>,
    task: Option<JoinHandle<()>>,
}

impl ChannelListenerFactory {
    pub fn new(
        broker: Arc<Broker>,
        channel: impl Into<Arc<str>>,
        destination: impl Into<Arc<str>>,
        sink: Arc<dyn MessageSink>,
        runtime: Handle,
    ) -> Self {
        Self {
            broker,
            channel: channel.into(),
            destination: destination.into(),
            sink,
            runtime,
        }
    }

    pub fn channel(&self) -> &Arc<str> {
        &self.channel
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }
}

impl ListenerResourceFactory for ChannelListenerFactory {
    type Handle = ChannelListener;

    fn initialize(&self) -> Result<ChannelListener, ResourceError> {
        let sender = self.broker.open(&self.channel)?;
        Ok(ChannelListener {
            broker: self.broker.clone(),
            channel: self.channel.clone(),
            destination: self.destination.clone(),
            sender: Some(sender),
            sink: self.sink.clone(),
            runtime: self.runtime.clone(),
            slot: None,
            task: None,
        })
    }

    fn dispose(
        &self,
        mut handle: ChannelListener,
    ) -> Result<(), ResourceError> {
        handle.stop()?;
        handle.sender = None;
        Ok(())
    }
}

impl ChannelListener {
    fn halt(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.lock().take();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl ListenerResourceHandle for ChannelListener {
    fn start(&mut self) -> Result<(), ResourceError> {
        if self.is_running() {
            return Ok(());
        }
        let sender = self.sender.clone().ok_or_else(|| {
            ResourceError::InvalidState(format!("listener on '{}' was disposed", self.channel))
        })?;
        self.halt();

        // Subscribe before spawning so nothing published after start() is missed.
        let slot: Slot = Arc::new(Mutex::new(Some(sender.subscribe(self.channel.clone()))));
        let task = forward(
            self.destination.clone(),
            slot.clone(),
            sender.waker().clone(),
            self.sink.clone(),
        );
        self.task = Some(self.runtime.spawn(task));
        self.slot = Some(slot);
        Ok(())
    }

    /// Detaches the receiver before returning.
    fn stop(&mut self) -> Result<(), ResourceError> {
        self.halt();
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.slot.as_ref().is_some_and(|slot| slot.lock().is_some())
    }

    /// False once disposed and once the channel was closed or replaced in the
    /// broker.
    fn is_initialized(&self) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        self.broker
            .sender(&self.channel)
            .is_some_and(|current| current.same_channel(sender))
    }
}

impl Drop for ChannelListener {
    fn drop(&mut self) {
        self.halt();
    }
}

enum Drained {
    Empty,
    More,
    Detached,
}

async fn forward(
    destination: Arc<str>,
    slot: Slot,
    wake: Arc<Notify>,
    sink: Arc<dyn MessageSink>,
) {
    tracing::debug!(%destination, "channel listener running");
    loop {
        let mut notified = std::pin::pin!(wake.notified());
        notified.as_mut().enable();

        match drain(&destination, &slot, &*sink) {
            Drained::Empty => notified.await,
            Drained::More => tokio::task::yield_now().await,
            Drained::Detached => break,
        }
    }
    tracing::debug!(%destination, "channel listener detached");
}

/// Forwards queued messages without holding the slot lock during delivery.
fn drain(
    destination: &Arc<str>,
    slot: &Slot,
    sink: &dyn MessageSink,
) -> Drained {
    for _ in 0..DRAIN_BATCH {
        let next = match slot.lock().as_mut() {
            Some(subscription) => subscription.try_recv(),
            None => return Drained::Detached,
        };
        match next {
            Ok(mut message) => {
                message.destination = destination.clone();
                sink.deliver(destination, message);
            }
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(%destination, skipped, "channel listener lagged");
            }
            Err(TryRecvError::Empty) => return Drained::Empty,
            Err(TryRecvError::Closed) => {
                tracing::debug!(%destination, "backing channel closed");
                slot.lock().take();
                return Drained::Detached;
            }
        }
    }
    Drained::More
}
