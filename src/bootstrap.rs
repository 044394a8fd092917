use std::sync::Arc;

use flexlink_error::{FlexResult, ResultExt};
use tokio::runtime::Handle;

use crate::{
    adapter::ChannelAdapter,
    broker::{Delivery, MessageBroker},
    chain::{AuthorizationStage, Chain, MaskServerErrors, TranslationStage},
    channel::Broker,
    config::Settings,
    registry::DestinationRegistry,
};

/// A configured broker and the channels behind its destinations.
pub struct App {
    pub broker: MessageBroker,
    pub channels: Arc<Broker>,
}

/// Builds the broker described by `settings`: one channel adapter per
/// configured destination, role checks for destinations declaring roles and
/// masking of server-side errors.
///
/// Listener tasks are spawned on `runtime`.
pub fn build(
    settings: &Settings,
    runtime: Handle,
) -> FlexResult<App> {
    let channels = Arc::new(Broker::new(settings.broker.channel_capacity));
    let delivery = Arc::new(Delivery::new());

    let mut registry = DestinationRegistry::new();
    let mut authorization = AuthorizationStage::new();

    for destination in &settings.destinations {
        let adapter = ChannelAdapter::new(
            destination.id.as_str(),
            destination.channel(),
            channels.clone(),
            delivery.clone(),
            runtime.clone(),
        );
        registry
            .register_messaging(Arc::new(adapter))
            .with_context(|| format!("configuring destination '{}'", destination.id))?;

        if !destination.roles.is_empty() {
            authorization = authorization.require(destination.id.as_str(), &destination.roles);
        }
    }

    let chain = Chain::new()
        .with(TranslationStage::new().with(MaskServerErrors))
        .with(authorization);

    tracing::debug!(
        destinations = registry.len(),
        channel_capacity = settings.broker.channel_capacity,
        "broker assembled"
    );

    Ok(App {
        broker: MessageBroker::new(registry, chain, delivery),
        channels,
    })
}

impl App {
    /// Stops every adapter, then closes all channels.
    pub fn shutdown(&self) -> FlexResult<()> {
        let result = self.broker.stop();
        self.channels.shutdown();
        result
    }
}
