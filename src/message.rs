use std::{collections::BTreeMap, sync::Arc};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message travelling between clients, destinations and backing channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub destination: Arc<str>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Authenticated caller attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Subscribe,
    Unsubscribe,
    Publish(Message),
    Invoke {
        operation: String,
        args: Vec<serde_json::Value>,
    },
}

/// Inbound client request routed by the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub client_id: Arc<str>,
    pub destination: Arc<str>,
    pub principal: Option<Principal>,
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ack,
    /// Number of channel receivers the message reached.
    Published { receivers: usize },
    Result(serde_json::Value),
}

impl Message {
    pub fn new(
        destination: impl Into<Arc<str>>,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            destination: destination.into(),
            headers: BTreeMap::new(),
            body: body.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_header(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn header(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

impl Principal {
    pub fn new(
        name: impl Into<String>,
        roles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_role(
        &self,
        role: &str,
    ) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl RequestBody {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Publish(_) => "publish",
            Self::Invoke { .. } => "invoke",
        }
    }
}

impl Request {
    fn new(
        client_id: &str,
        destination: &str,
        body: RequestBody,
    ) -> Self {
        Self {
            client_id: Arc::from(client_id),
            destination: Arc::from(destination),
            principal: None,
            body,
        }
    }

    pub fn subscribe(
        client_id: &str,
        destination: &str,
    ) -> Self {
        Self::new(client_id, destination, RequestBody::Subscribe)
    }

    pub fn unsubscribe(
        client_id: &str,
        destination: &str,
    ) -> Self {
        Self::new(client_id, destination, RequestBody::Unsubscribe)
    }

    pub fn publish(
        client_id: &str,
        destination: &str,
        body: impl Into<Bytes>,
    ) -> Self {
        let message = Message::new(destination, body);
        Self::new(client_id, destination, RequestBody::Publish(message))
    }

    pub fn invoke(
        client_id: &str,
        destination: &str,
        operation: impl Into<String>,
        args: Vec<serde_json::Value>,
    ) -> Self {
        Self::new(
            client_id,
            destination,
            RequestBody::Invoke {
                operation: operation.into(),
                args,
            },
        )
    }

    pub fn with_principal(
        mut self,
        principal: Principal,
    ) -> Self {
        self.principal = Some(principal);
        self
    }
}
