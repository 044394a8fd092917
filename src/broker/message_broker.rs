use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use flexlink_error::{BrokerError, FlexResult, ResultExt, StackError};
use tokio::sync::mpsc;

use super::Delivery;
use crate::{
    adapter::MessagingAdapter,
    chain::{Chain, Endpoint},
    registry::{Destination, DestinationRegistry, RemotingExport},
    Message, Request, RequestBody, Response,
};

/// Entry point for client requests.
///
/// Every request passes through the chain before it reaches the destination
/// it names. The same [`Delivery`] must be the sink of every channel adapter
/// in the registry, otherwise their messages never reach a client. Clients
/// pruned by the delivery are unsubscribed from their adapters.
pub struct MessageBroker {
    registry: DestinationRegistry,
    chain: Chain,
    delivery: Arc<Delivery>,
}

/// Terminal stage of the chain.
struct Dispatcher<'a> {
    registry: &'a DestinationRegistry,
    delivery: &'a Delivery,
}

impl MessageBroker {
    pub fn new(
        registry: DestinationRegistry,
        chain: Chain,
        delivery: Arc<Delivery>,
    ) -> Self {
        let adapters: HashMap<Arc<str>, Weak<dyn MessagingAdapter>> = registry
            .adapters()
            .map(|adapter| (adapter.destination().clone(), Arc::downgrade(adapter)))
            .collect();
        delivery.on_departure(move |client_id, destinations| {
            let departed = destinations
                .iter()
                .filter_map(|id| adapters.get(id).and_then(Weak::upgrade))
                .map(|adapter| adapter.unsubscribe(client_id));
            if let Err(e) = first_error(departed) {
                tracing::warn!(client_id, error = %e, "unsubscribing departed client failed");
            }
        });

        Self {
            registry,
            chain,
            delivery,
        }
    }

    pub fn registry(&self) -> &DestinationRegistry {
        &self.registry
    }

    pub fn delivery(&self) -> &Arc<Delivery> {
        &self.delivery
    }

    /// Starts every messaging adapter, stopping at the first failure.
    pub fn start(&self) -> FlexResult<()> {
        for adapter in self.registry.adapters() {
            adapter.start()?;
        }
        tracing::info!(destinations = self.registry.len(), "message broker started");
        Ok(())
    }

    /// Stops every messaging adapter. All adapters are attempted; the first
    /// error is returned.
    pub fn stop(&self) -> FlexResult<()> {
        let first = first_error(self.registry.adapters().map(|a| a.stop()));
        tracing::info!("message broker stopped");
        first
    }

    pub fn connect(
        &self,
        client_id: &str,
    ) -> mpsc::UnboundedReceiver<Message> {
        tracing::debug!(client_id, "client connected");
        self.delivery.connect(client_id)
    }

    /// Unsubscribes `client_id` everywhere and drops its outbox.
    pub fn disconnect(
        &self,
        client_id: &str,
    ) -> FlexResult<()> {
        let destinations = self.delivery.disconnect(client_id);
        tracing::debug!(client_id, subscriptions = destinations.len(), "client disconnected");

        first_error(destinations.iter().filter_map(|id| {
            match self.registry.get(id) {
                Some(Destination::Messaging(adapter)) => Some(adapter.unsubscribe(client_id)),
                _ => None,
            }
        }))
    }

    pub fn handle(
        &self,
        request: Request,
    ) -> FlexResult<Response> {
        let dispatcher = Dispatcher {
            registry: &self.registry,
            delivery: &self.delivery,
        };
        self.chain.execute(request, &dispatcher)
    }
}

impl Endpoint for Dispatcher<'_> {
    fn dispatch(
        &self,
        request: Request,
    ) -> FlexResult<Response> {
        let destination =
            self.registry
                .get(&request.destination)
                .ok_or_else(|| BrokerError::DestinationNotFound {
                    destination: request.destination.to_string(),
                })?;

        match (destination, request.body) {
            (Destination::Messaging(adapter), RequestBody::Subscribe) => {
                self.subscribe(adapter, &request.client_id)
            }
            (Destination::Messaging(adapter), RequestBody::Unsubscribe) => {
                self.delivery
                    .remove_route(adapter.destination(), &request.client_id);
                adapter.unsubscribe(&request.client_id)?;
                Ok(Response::Ack)
            }
            (Destination::Messaging(adapter), RequestBody::Publish(message)) => {
                let receivers = adapter.invoke(message)?;
                Ok(Response::Published { receivers })
            }
            (Destination::Remoting(export), RequestBody::Invoke { operation, args }) => {
                invoke(export, &request.destination, &operation, &args)
            }
            (_, body) => Err(BrokerError::UnsupportedRequest {
                destination: request.destination.to_string(),
                request: body.kind(),
            }
            .into()),
        }
    }
}

impl Dispatcher<'_> {
    /// The route is recorded before the adapter is asked, and kept when the
    /// adapter fails: the subscription exists, the listener may come up later.
    ///
    /// The client's outbox is held throughout, so a concurrent disconnect
    /// either precedes the check or sees the new route.
    fn subscribe(
        &self,
        adapter: &Arc<dyn MessagingAdapter>,
        client_id: &str,
    ) -> FlexResult<Response> {
        let Some(_outbox) = self.delivery.outbox(client_id) else {
            return Err(BrokerError::ClientNotConnected {
                client_id: client_id.to_string(),
            }
            .into());
        };
        self.delivery.add_route(adapter.destination(), client_id);
        adapter.subscribe(client_id)?;
        Ok(Response::Ack)
    }
}

fn invoke(
    export: &RemotingExport,
    destination: &str,
    operation: &str,
    args: &[serde_json::Value],
) -> FlexResult<Response> {
    if !export.options().is_allowed(operation) {
        return Err(BrokerError::OperationNotAllowed {
            destination: destination.to_string(),
            operation: operation.to_string(),
        }
        .into());
    }
    let value = export
        .target()
        .invoke(operation, args)
        .with_context(|| format!("invoking '{operation}' on '{destination}'"))?;
    Ok(Response::Result(value))
}

fn first_error(results: impl Iterator<Item = FlexResult<()>>) -> FlexResult<()> {
    let mut first: Option<StackError> = None;
    for result in results {
        if let Err(e) = result {
            first.get_or_insert(e);
        }
    }
    first.map_or(Ok(()), Err)
}
