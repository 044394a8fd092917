use std::fmt;

use flexlink_error::ResourceError;

/// Observable state of a destination's listener resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Uninitialized,
    Stopped,
    Running,
}

/// Drives the running/stopped state of an initialized listener.
pub trait ListenerResourceHandle: Send {
    fn start(&mut self) -> Result<(), ResourceError>;

    fn stop(&mut self) -> Result<(), ResourceError>;

    fn is_running(&self) -> bool;

    fn is_initialized(&self) -> bool;
}

/// Allocates and releases the underlying consumer of a destination.
///
/// `initialize` either hands back a usable handle or fails; no partially
/// initialized handle is ever returned.
pub trait ListenerResourceFactory: Send + Sync {
    type Handle: ListenerResourceHandle;

    fn initialize(&self) -> Result<Self::Handle, ResourceError>;

    fn dispose(
        &self,
        handle: Self::Handle,
    ) -> Result<(), ResourceError>;
}

impl ResourceState {
    pub fn of<H: ListenerResourceHandle>(handle: Option<&H>) -> Self {
        match handle {
            Some(h) if !h.is_initialized() => Self::Uninitialized,
            Some(h) if h.is_running() => Self::Running,
            Some(_) => Self::Stopped,
            None => Self::Uninitialized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Stopped => "stopped",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
