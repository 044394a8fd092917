//! Subscription-driven listener lifecycle.
//!
//! - `subscribers`: exact membership of subscriber identities per destination.
//! - `resource`: the contract a listener resource and its factory implement.
//! - `coordinator`: keeps "at least one subscriber" and "listener running" in
//!   step for one destination.

pub mod coordinator;
pub mod resource;
pub mod subscribers;

pub use coordinator::*;
pub use resource::*;
pub use subscribers::*;
