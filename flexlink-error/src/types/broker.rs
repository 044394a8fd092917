use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Errors of the request routing layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("destination not found: {destination}")]
    DestinationNotFound { destination: String },

    #[error("destination already registered: {destination}")]
    DuplicateDestination { destination: String },

    #[error("client not connected: {client_id}")]
    ClientNotConnected { client_id: String },

    #[error("operation '{operation}' is not allowed on destination '{destination}'")]
    OperationNotAllowed {
        destination: String,
        operation: String,
    },

    #[error("destination '{destination}' does not support {request}")]
    UnsupportedRequest {
        destination: String,
        request: &'static str,
    },

    #[error("authentication required for destination '{destination}'")]
    Unauthorized { destination: String },

    #[error("principal '{principal}' may not access destination '{destination}'")]
    PermissionDenied {
        destination: String,
        principal: String,
    },
}

impl ErrorExt for BrokerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::DestinationNotFound { .. } => StatusCode::DestinationNotFound,
            Self::DuplicateDestination { .. } => StatusCode::AlreadyExists,
            Self::ClientNotConnected { .. } => StatusCode::ClientNotConnected,
            Self::OperationNotAllowed { .. } => StatusCode::OperationNotAllowed,
            Self::UnsupportedRequest { .. } => StatusCode::Unsupported,
            Self::Unauthorized { .. } => StatusCode::Unauthorized,
            Self::PermissionDenied { .. } => StatusCode::PermissionDenied,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::PermissionDenied { destination, .. } => {
                format!("Access denied to destination '{destination}'")
            }
            _ => self.to_string(),
        }
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "broker".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        match self {
            Self::DestinationNotFound { destination }
            | Self::DuplicateDestination { destination }
            | Self::Unauthorized { destination }
            | Self::PermissionDenied { destination, .. }
            | Self::UnsupportedRequest { destination, .. } => {
                tags.push(("destination", destination.clone()));
            }
            Self::OperationNotAllowed {
                destination,
                operation,
            } => {
                tags.push(("destination", destination.clone()));
                tags.push(("operation", operation.clone()));
            }
            _ => {}
        }

        tags
    }
}
