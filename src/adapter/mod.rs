//! Adapters bridging destinations to backing channels.
//!
//! - `listener`: channel listener resource started and stopped by the
//!   lifecycle coordinator.
//! - `channel_adapter`: one destination bound to one backing channel.

pub mod channel_adapter;
pub mod listener;

pub use channel_adapter::*;
pub use listener::*;
