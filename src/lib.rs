//! Messaging destinations whose backing listeners run only while clients are
//! subscribed.
//!
//! A [`MessageBroker`] routes client requests through a [`Chain`] to the
//! destinations of a [`DestinationRegistry`]. Messaging destinations are
//! served by [`ChannelAdapter`]s, each owning a
//! [`SubscriptionLifecycleCoordinator`] that starts the channel listener on
//! the first subscription and stops it after the last one.

/// Destination adapters over backing channels.
pub mod adapter;
/// Wiring of a broker from [`Settings`].
pub mod bootstrap;
/// Client-facing broker and message fan-out.
pub mod broker;
/// Request chain: interception, error translation, authorization.
pub mod chain;
/// In-process pub/sub channels backing the destinations.
pub mod channel;
/// Settings loading (file + environment).
pub mod config;
/// Error types and result aliases.
pub mod error;
/// Subscription-counted listener lifecycle.
pub mod lifecycle;
/// Structured logging.
pub mod logging;
/// Messages, requests and responses.
pub mod message;
/// Destination registry and remoting exports.
pub mod registry;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

pub use adapter::{ChannelAdapter, MessageSink, MessagingAdapter};
pub use broker::{Delivery, MessageBroker};
pub use chain::{
    AuthorizationStage, Chain, Endpoint, ExceptionTranslator, InterceptionStage, MaskServerErrors,
    MessageInterceptor, Next, Stage, TranslationStage,
};
pub use channel::{Broker, ChannelSender, Subscription};
pub use config::{DestinationConfig, Settings, SettingsError};
pub use error::{
    BrokerError, FlexResult, LifecycleError, RecvError, ResourceError, StackError, StatusCode,
    TryRecvError,
};
pub use lifecycle::{
    ListenerResourceFactory, ListenerResourceHandle, ResourceState,
    SubscriptionLifecycleCoordinator,
};
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
pub use message::{Message, Principal, Request, RequestBody, Response};
pub use registry::{Destination, DestinationRegistry, RemotingOptions, RemotingTarget};
