use std::fmt;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Failure reported by a listener resource or its factory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("resource unavailable: {0}")]
    Unavailable(String),

    #[error("resource in invalid state: {0}")]
    InvalidState(String),

    #[error("resource failure: {0}")]
    Failed(String),
}

/// Transition of an already initialized resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Stop,
    Dispose,
}

/// Errors surfaced by the subscription lifecycle coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("failed to initialize listener for destination '{destination}': {source}")]
    ResourceInitialization {
        destination: String,
        #[source]
        source: ResourceError,
    },

    #[error("listener for destination '{destination}' failed to {transition}: {source}")]
    ResourceTransition {
        destination: String,
        transition: Transition,
        #[source]
        source: ResourceError,
    },
}

impl LifecycleError {
    pub fn destination(&self) -> &str {
        match self {
            Self::ResourceInitialization { destination, .. }
            | Self::ResourceTransition { destination, .. } => destination,
        }
    }

    pub fn resource_error(&self) -> &ResourceError {
        match self {
            Self::ResourceInitialization { source, .. }
            | Self::ResourceTransition { source, .. } => source,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Dispose => "dispose",
        };
        f.write_str(s)
    }
}

impl ErrorExt for ResourceError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unavailable(_) => StatusCode::ResourceUnavailable,
            Self::InvalidState(_) => StatusCode::InvalidResourceState,
            Self::Failed(_) => StatusCode::ResourceTransitionFailed,
        }
    }
}

impl ErrorExt for LifecycleError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceInitialization { .. } => StatusCode::ResourceInitFailed,
            Self::ResourceTransition { .. } => StatusCode::ResourceTransitionFailed,
        }
    }

    fn client_message(&self) -> String {
        format!("Destination '{}' is temporarily unavailable", self.destination())
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "lifecycle".to_string()),
            ("status_code", self.status_code().to_string()),
            ("destination", self.destination().to_string()),
        ];
        if let Self::ResourceTransition { transition, .. } = self {
            tags.push(("transition", transition.to_string()));
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_transition_error_display() {
        let err = LifecycleError::ResourceTransition {
            destination: "quotes".to_string(),
            transition: Transition::Start,
            source: ResourceError::Failed("broker gone".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "listener for destination 'quotes' failed to start: resource failure: broker gone"
        );
        assert_eq!(err.status_code(), StatusCode::ResourceTransitionFailed);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_init_error_client_message_hides_cause() {
        let err = LifecycleError::ResourceInitialization {
            destination: "quotes".to_string(),
            source: ResourceError::Unavailable("secret-host:61616".to_string()),
        };
        assert_eq!(err.status_code(), StatusCode::ResourceInitFailed);
        assert!(!err.client_message().contains("secret-host"));
        assert_eq!(err.destination(), "quotes");
    }

    #[test]
    fn test_metrics_tags_carry_transition() {
        let err = LifecycleError::ResourceTransition {
            destination: "quotes".to_string(),
            transition: Transition::Stop,
            source: ResourceError::InvalidState("closed".to_string()),
        };
        let tags = err.metrics_tags();
        assert!(tags.contains(&("transition", "stop".to_string())));
        assert!(tags.contains(&("destination", "quotes".to_string())));
    }
}
