use std::{
    collections::BTreeSet,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use dashmap::{mapref::one::Ref, DashMap};
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::{adapter::MessageSink, Message};

type ClientKey = Arc<str>;
type DestinationKey = Arc<str>;
type Outbox = mpsc::UnboundedSender<Message>;

/// Called with a pruned client and the destinations it was routed to.
pub type DepartureHook = Box<dyn Fn(&str, &[Arc<str>]) + Send + Sync>;

/// Client outboxes and the destination → clients routing table.
///
/// Adapters push every message their listener receives into
/// [`MessageSink::deliver`]; the message is copied into the outbox of each
/// client routed to that destination. A client whose outbox turns out closed
/// is dropped together with its routes and reported to the departure hook.
#[derive(Default)]
pub struct Delivery {
    outboxes: DashMap<ClientKey, Outbox>,
    routes: DashMap<DestinationKey, BTreeSet<ClientKey>>,
    departures: RwLock<Option<DepartureHook>>,
    /// Messages placed into an outbox
    pub delivered_count: AtomicUsize,
    /// Messages dropped because the client outbox was closed
    pub dropped_count: AtomicUsize,
}

impl Delivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the outbox of `client_id`. A previous outbox is replaced and
    /// its receiver sees the channel closed; routes are kept.
    pub fn connect(
        &self,
        client_id: &str,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outboxes.insert(Arc::from(client_id), tx);
        rx
    }

    /// Drops the outbox and every route of `client_id`.
    ///
    /// Returns the destinations the client was routed to, sorted.
    pub fn disconnect(
        &self,
        client_id: &str,
    ) -> Vec<Arc<str>> {
        self.outboxes.remove(client_id);
        self.take_routes(client_id)
    }

    /// Installs the callback told about clients pruned during delivery,
    /// replacing any previous one.
    pub fn on_departure(
        &self,
        hook: impl Fn(&str, &[Arc<str>]) + Send + Sync + 'static,
    ) {
        *self.departures.write() = Some(Box::new(hook));
    }

    /// Outbox of `client_id`, held for as long as the guard lives.
    ///
    /// [`disconnect`](Self::disconnect) and pruning wait for the guard, so
    /// routes added under it are seen by them.
    pub(crate) fn outbox(
        &self,
        client_id: &str,
    ) -> Option<Ref<'_, ClientKey, Outbox>> {
        self.outboxes.get(client_id)
    }

    fn take_routes(
        &self,
        client_id: &str,
    ) -> Vec<Arc<str>> {
        let mut left = Vec::new();
        self.routes.retain(|destination, clients| {
            if clients.remove(client_id) {
                left.push(destination.clone());
            }
            !clients.is_empty()
        });
        left.sort();
        left
    }

    pub fn is_connected(
        &self,
        client_id: &str,
    ) -> bool {
        self.outboxes.contains_key(client_id)
    }

    pub fn client_count(&self) -> usize {
        self.outboxes.len()
    }

    /// Returns `true` if the route is new.
    pub fn add_route(
        &self,
        destination: &Arc<str>,
        client_id: &str,
    ) -> bool {
        self.routes
            .entry(destination.clone())
            .or_default()
            .insert(Arc::from(client_id))
    }

    /// Returns `true` if the route existed.
    pub fn remove_route(
        &self,
        destination: &str,
        client_id: &str,
    ) -> bool {
        let removed = match self.routes.get_mut(destination) {
            Some(mut clients) => clients.remove(client_id),
            None => false,
        };
        self.routes
            .remove_if(destination, |_, clients| clients.is_empty());
        removed
    }

    /// Clients routed to `destination`, sorted.
    pub fn routes_of(
        &self,
        destination: &str,
    ) -> Vec<Arc<str>> {
        self.routes
            .get(destination)
            .map(|clients| clients.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl MessageSink for Delivery {
    fn deliver(
        &self,
        destination: &Arc<str>,
        message: Message,
    ) {
        let clients = self.routes_of(destination);
        for client_id in clients {
            let closed = match self.outboxes.get(&client_id) {
                Some(tx) => tx.send(message.clone()).is_err(),
                None => continue,
            };

            if closed {
                self.dropped_count.fetch_add(1, Ordering::Relaxed);
                self.prune(destination, &client_id);
            } else {
                self.delivered_count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl Delivery {
    fn prune(
        &self,
        destination: &Arc<str>,
        client_id: &str,
    ) {
        // A reconnect may have installed a fresh outbox meanwhile.
        if self
            .outboxes
            .remove_if(client_id, |_, tx| tx.is_closed())
            .is_none()
        {
            return;
        }
        let left = self.take_routes(client_id);
        tracing::debug!(
            destination = %destination,
            client_id,
            routes = left.len(),
            "client outbox closed, dropping it"
        );
        if let Some(hook) = self.departures.read().as_ref() {
            hook(client_id, &left);
        }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("clients", &self.outboxes.len())
            .field("routes", &self.routes.len())
            .field("departure_hook", &self.departures.read().is_some())
            .field("delivered_count", &self.delivered_count)
            .field("dropped_count", &self.dropped_count)
            .finish()
    }
}
