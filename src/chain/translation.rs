use std::sync::Arc;

use flexlink_error::{FlexResult, GenericError, StackError};

use super::{Next, Stage};
use crate::{error::report, Request, Response};

/// Converts errors escaping later stages into client-facing ones.
pub trait ExceptionTranslator: Send + Sync {
    fn handles(
        &self,
        error: &StackError,
    ) -> bool;

    fn translate(
        &self,
        error: StackError,
    ) -> StackError;
}

/// Replaces server-side errors with their client message, keeping the status
/// code. Internal details stay in the logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskServerErrors;

impl ExceptionTranslator for MaskServerErrors {
    fn handles(
        &self,
        error: &StackError,
    ) -> bool {
        error.status_code().is_server_error()
    }

    fn translate(
        &self,
        error: StackError,
    ) -> StackError {
        report(&error, "request failed");
        StackError::new(GenericError::new(
            error.status_code(),
            error.client_message(),
        ))
    }
}

/// Hands an error to the first translator that claims it. Errors nobody
/// claims pass through untouched.
#[derive(Clone, Default)]
pub struct TranslationStage {
    translators: Vec<Arc<dyn ExceptionTranslator>>,
}

impl TranslationStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        translator: impl ExceptionTranslator + 'static,
    ) -> Self {
        self.translators.push(Arc::new(translator));
        self
    }

    fn translate(
        &self,
        error: StackError,
    ) -> StackError {
        match self.translators.iter().find(|t| t.handles(&error)) {
            Some(translator) => translator.translate(error),
            None => error,
        }
    }
}

impl Stage for TranslationStage {
    fn handle(
        &self,
        request: Request,
        next: Next<'_>,
    ) -> FlexResult<Response> {
        next.run(request).map_err(|e| self.translate(e))
    }
}
