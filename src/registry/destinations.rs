use std::{collections::BTreeMap, fmt, sync::Arc};

use flexlink_error::{BrokerError, FlexResult};

use super::{RemotingExport, RemotingOptions, RemotingTarget};
use crate::adapter::MessagingAdapter;

/// What a destination id resolves to.
#[derive(Clone)]
pub enum Destination {
    Messaging(Arc<dyn MessagingAdapter>),
    Remoting(RemotingExport),
}

impl Destination {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Messaging(_) => "messaging",
            Self::Remoting(_) => "remoting",
        }
    }
}

impl fmt::Debug for Destination {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Messaging(adapter) => f
                .debug_tuple("Messaging")
                .field(adapter.destination())
                .finish(),
            Self::Remoting(export) => f.debug_tuple("Remoting").field(export).finish(),
        }
    }
}

/// Destinations known to the broker, keyed by id.
///
/// Filled once at startup, read-only afterwards.
#[derive(Debug, Default)]
pub struct DestinationRegistry {
    destinations: BTreeMap<Arc<str>, Destination>,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a messaging adapter under its own destination id.
    pub fn register_messaging(
        &mut self,
        adapter: Arc<dyn MessagingAdapter>,
    ) -> FlexResult<()> {
        let id = adapter.destination().clone();
        self.insert(id, Destination::Messaging(adapter))
    }

    pub fn register_remoting(
        &mut self,
        id: impl Into<Arc<str>>,
        target: Arc<dyn RemotingTarget>,
        options: RemotingOptions,
    ) -> FlexResult<()> {
        self.insert(
            id.into(),
            Destination::Remoting(RemotingExport::new(target, options)),
        )
    }

    fn insert(
        &mut self,
        id: Arc<str>,
        destination: Destination,
    ) -> FlexResult<()> {
        if self.destinations.contains_key(&id) {
            return Err(BrokerError::DuplicateDestination {
                destination: id.to_string(),
            }
            .into());
        }
        tracing::debug!(destination = %id, kind = destination.kind(), "destination registered");
        self.destinations.insert(id, destination);
        Ok(())
    }

    pub fn get(
        &self,
        id: &str,
    ) -> Option<&Destination> {
        self.destinations.get(id)
    }

    /// Sorted destination ids.
    pub fn ids(&self) -> Vec<Arc<str>> {
        self.destinations.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    /// Messaging adapters in id order.
    pub fn adapters(&self) -> impl Iterator<Item = &Arc<dyn MessagingAdapter>> {
        self.destinations.values().filter_map(|d| match d {
            Destination::Messaging(adapter) => Some(adapter),
            Destination::Remoting(_) => None,
        })
    }
}
