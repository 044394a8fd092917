use std::fmt;

use num_enum::TryFromPrimitive;

/// Status codes used to categorize errors.
///
/// # Ranges:
/// - 1xxx: General errors
/// - 2xxx: Lookup errors
/// - 3xxx: Authorization
/// - 5xxx: Listener resources
/// - 6xxx: IO
///
/// `num_enum::TryFromPrimitive` provides the `TryFrom<u32>` implementation used
/// by [`StatusCode::from_u32`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 1xxx: General errors ===
    Unsupported = 1001,
    Internal = 1003,
    InvalidArgs = 1004,

    // === 2xxx: Lookup ===
    NotFound = 2000,
    AlreadyExists = 2001,
    DestinationNotFound = 2004,
    ClientNotConnected = 2005,

    // === 3xxx: Authorization ===
    PermissionDenied = 3001,
    Unauthorized = 3002,
    OperationNotAllowed = 3003,

    // === 5xxx: Listener resources ===
    ResourceUnavailable = 5000,
    ResourceInitFailed = 5001,
    ResourceTransitionFailed = 5002,
    InvalidResourceState = 5003,

    // === 6xxx: IO ===
    Io = 6000,
    Timeout = 6002,
    ConnectionFailed = 6003,
}

/// Severity an error is logged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Numeric representation of the status code.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Maps a raw `u32` back to a `StatusCode`.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Client side error: the request itself is wrong.
    ///
    /// `InvalidArgs` (1004) belongs here even though it lives in 1xxx.
    pub fn is_client_error(&self) -> bool {
        (2000..=3999).contains(&self.code()) || matches!(self, Self::InvalidArgs)
    }

    /// Server side error: internal or infrastructure failure.
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Level the error is logged at when it reaches a request boundary.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::NotFound | Self::AlreadyExists | Self::DestinationNotFound => LogLevel::Debug,
            Self::InvalidArgs | Self::ClientNotConnected | Self::Unsupported => LogLevel::Info,
            Self::PermissionDenied | Self::Unauthorized | Self::OperationNotAllowed => {
                LogLevel::Warn
            }
            Self::Io | Self::Timeout | Self::ConnectionFailed | Self::ResourceUnavailable => {
                LogLevel::Warn
            }
            Self::Internal
            | Self::ResourceInitFailed
            | Self::ResourceTransitionFailed
            | Self::InvalidResourceState => LogLevel::Error,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait implementations for StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
