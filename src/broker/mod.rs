//! Client-facing broker: routing of requests to destinations and fan-out of
//! destination messages to connected clients.

pub mod delivery;
pub mod message_broker;

pub use delivery::*;
pub use message_broker::*;
