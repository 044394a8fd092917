//! In-process publish–subscribe channels.
//!
//! Backing channel technology that adapters bridge destinations to:
//!
//! - `broker`: channel registry, publishing and delivery statistics.
//! - `subscription`: receiving side of one channel.

pub mod broker;
pub mod subscription;

pub use broker::*;
pub use subscription::*;
