//! Ordered request-handling chain.
//!
//! Each stage sees the request before the stages registered after it and
//! decides whether to pass it on through [`Next`]. The last `Next` calls the
//! terminal [`Endpoint`].
//!
//! - `interception`: pre/post processing of requests and responses.
//! - `translation`: rewriting of errors coming back from later stages.
//! - `authorization`: role checks per destination.

pub mod authorization;
pub mod interception;
pub mod translation;

use std::sync::Arc;

pub use authorization::*;
use flexlink_error::FlexResult;
pub use interception::*;
pub use translation::*;

use crate::{Request, Response};

/// One link of the chain.
pub trait Stage: Send + Sync {
    fn handle(
        &self,
        request: Request,
        next: Next<'_>,
    ) -> FlexResult<Response>;
}

/// Where a request ends up once every stage has passed it on.
pub trait Endpoint {
    fn dispatch(
        &self,
        request: Request,
    ) -> FlexResult<Response>;
}

/// Remainder of the chain after the current stage.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub fn run(
        self,
        request: Request,
    ) -> FlexResult<Response> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.handle(
                request,
                Next {
                    stages: rest,
                    endpoint: self.endpoint,
                },
            ),
            None => self.endpoint.dispatch(request),
        }
    }
}

/// Stages in registration order.
#[derive(Clone, Default)]
pub struct Chain {
    stages: Vec<Arc<dyn Stage>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        stage: impl Stage + 'static,
    ) -> Self {
        self.push(stage);
        self
    }

    pub fn push(
        &mut self,
        stage: impl Stage + 'static,
    ) {
        self.stages.push(Arc::new(stage));
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn execute(
        &self,
        request: Request,
        endpoint: &dyn Endpoint,
    ) -> FlexResult<Response> {
        Next {
            stages: &self.stages,
            endpoint,
        }
        .run(request)
    }
}
