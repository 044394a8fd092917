use std::sync::Arc;

use flexlink_error::FlexResult;

use super::{Next, Stage};
use crate::{Request, Response};

/// Hook around request handling.
///
/// Both methods default to pass-through so an interceptor only overrides the
/// side it cares about.
pub trait MessageInterceptor: Send + Sync {
    fn pre_process(
        &self,
        _request: &mut Request,
    ) -> FlexResult<()> {
        Ok(())
    }

    fn post_process(
        &self,
        _request: &Request,
        response: Response,
    ) -> FlexResult<Response> {
        Ok(response)
    }
}

/// Runs `pre_process` in registration order and `post_process` in reverse
/// order.
#[derive(Clone, Default)]
pub struct InterceptionStage {
    interceptors: Vec<Arc<dyn MessageInterceptor>>,
}

impl InterceptionStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        interceptor: impl MessageInterceptor + 'static,
    ) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl Stage for InterceptionStage {
    fn handle(
        &self,
        mut request: Request,
        next: Next<'_>,
    ) -> FlexResult<Response> {
        for interceptor in &self.interceptors {
            interceptor.pre_process(&mut request)?;
        }

        let processed = request.clone();
        let mut response = next.run(request)?;

        for interceptor in self.interceptors.iter().rev() {
            response = interceptor.post_process(&processed, response)?;
        }
        Ok(response)
    }
}
