use std::sync::Arc;

use flexlink_error::{FlexResult, ResultExt};
use tokio::runtime::Handle;

use super::{ChannelListenerFactory, MessageSink};
use crate::{
    channel::Broker,
    error::report,
    lifecycle::{ResourceState, SubscriptionLifecycleCoordinator},
    Message,
};

/// Destination side of an adapter, as seen by the broker.
pub trait MessagingAdapter: Send + Sync {
    fn destination(&self) -> &Arc<str>;

    /// Adapter lifecycle start (configuration time).
    fn start(&self) -> FlexResult<()>;

    /// Adapter teardown; the listener is disposed whatever the subscriptions.
    fn stop(&self) -> FlexResult<()>;

    fn subscribe(
        &self,
        client_id: &str,
    ) -> FlexResult<()>;

    fn unsubscribe(
        &self,
        client_id: &str,
    ) -> FlexResult<()>;

    /// Sends a client message into the backing channel. Returns the number of
    /// channel receivers reached.
    fn invoke(
        &self,
        message: Message,
    ) -> FlexResult<usize>;

    fn state(&self) -> ResourceState;

    fn subscriber_count(&self) -> usize;
}

/// Binds one destination to one [`Broker`] channel.
///
/// Inbound: the channel listener runs while the destination has subscribers
/// and hands every message to the sink. Outbound: client messages are
/// published straight into the channel.
pub struct ChannelAdapter {
    coordinator: SubscriptionLifecycleCoordinator<ChannelListenerFactory>,
}

impl ChannelAdapter {
    pub fn new(
        destination: impl Into<Arc<str>>,
        channel: impl Into<Arc<str>>,
        broker: Arc<Broker>,
        sink: Arc<dyn MessageSink>,
        runtime: Handle,
    ) -> Self {
        let destination: Arc<str> = destination.into();
        let factory =
            ChannelListenerFactory::new(broker, channel, destination.clone(), sink, runtime);
        Self {
            coordinator: SubscriptionLifecycleCoordinator::new(destination, factory),
        }
    }

    pub fn channel(&self) -> &Arc<str> {
        self.coordinator.factory().channel()
    }

    pub fn coordinator(&self) -> &SubscriptionLifecycleCoordinator<ChannelListenerFactory> {
        &self.coordinator
    }
}

impl MessagingAdapter for ChannelAdapter {
    fn destination(&self) -> &Arc<str> {
        self.coordinator.destination()
    }

    fn start(&self) -> FlexResult<()> {
        self.coordinator
            .start()
            .with_context(|| format!("starting adapter for '{}'", self.destination()))?;
        tracing::info!(
            destination = %self.destination(),
            channel = %self.channel(),
            "channel adapter started"
        );
        Ok(())
    }

    fn stop(&self) -> FlexResult<()> {
        let result = self
            .coordinator
            .stop()
            .with_context(|| format!("stopping adapter for '{}'", self.destination()));
        match &result {
            Ok(()) => tracing::info!(destination = %self.destination(), "channel adapter stopped"),
            Err(e) => report(e, "channel adapter did not stop cleanly"),
        }
        result
    }

    fn subscribe(
        &self,
        client_id: &str,
    ) -> FlexResult<()> {
        if let Err(e) = self.coordinator.subscribe(client_id) {
            tracing::warn!(
                destination = %self.destination(),
                client_id,
                error = %e,
                "subscription recorded but listener is not running"
            );
            return Err(e).context(format!("subscribing '{client_id}'"));
        }
        tracing::debug!(
            destination = %self.destination(),
            client_id,
            subscribers = self.coordinator.subscriber_count(),
            "client subscribed"
        );
        Ok(())
    }

    fn unsubscribe(
        &self,
        client_id: &str,
    ) -> FlexResult<()> {
        if let Err(e) = self.coordinator.unsubscribe(client_id) {
            tracing::warn!(
                destination = %self.destination(),
                client_id,
                error = %e,
                "listener did not halt after last unsubscribe"
            );
            return Err(e).context(format!("unsubscribing '{client_id}'"));
        }
        tracing::debug!(
            destination = %self.destination(),
            client_id,
            subscribers = self.coordinator.subscriber_count(),
            "client unsubscribed"
        );
        Ok(())
    }

    fn invoke(
        &self,
        mut message: Message,
    ) -> FlexResult<usize> {
        message.destination = self.destination().clone();
        let receivers = self
            .coordinator
            .factory()
            .broker()
            .publish(self.channel(), message);
        tracing::trace!(destination = %self.destination(), receivers, "message published");
        Ok(receivers)
    }

    fn state(&self) -> ResourceState {
        self.coordinator.state()
    }

    fn subscriber_count(&self) -> usize {
        self.coordinator.subscriber_count()
    }
}
