use std::{error::Error, fmt, panic::Location, sync::Arc};

use crate::{ErrorExt, LogLevel, StatusCode};

/// Error returned by every fallible flexlink operation.
///
/// Holds the originating [`ErrorExt`] plus the notes callers attached while
/// the error travelled outwards, oldest first. Each note records where it was
/// attached.
#[derive(Clone)]
pub struct StackError {
    origin: Arc<dyn ErrorExt>,
    notes: Vec<ErrorContext>,
}

/// A note attached through [`StackError::context`].
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub message: String,
    pub location: &'static Location<'static>,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl StackError {
    pub fn new<E: ErrorExt>(err: E) -> Self {
        Self {
            origin: Arc::new(err),
            notes: Vec::new(),
        }
    }

    #[track_caller]
    pub fn context(
        mut self,
        msg: impl Into<String>,
    ) -> Self {
        self.notes.push(ErrorContext {
            message: msg.into(),
            location: Location::caller(),
        });
        self
    }

    /// Status of the originating error. Notes never change it.
    pub fn status_code(&self) -> StatusCode {
        self.origin.status_code()
    }

    pub fn client_message(&self) -> String {
        self.origin.client_message()
    }

    pub fn contexts(&self) -> &[ErrorContext] {
        &self.notes
    }

    pub fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        self.origin.metrics_tags()
    }

    pub fn log_level(&self) -> LogLevel {
        self.status_code().log_level()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.message,
            self.location.file(),
            self.location.line()
        )
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait implementations for StackError
////////////////////////////////////////////////////////////////////////////////

impl fmt::Debug for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let notes: Vec<String> = self.notes.iter().map(ToString::to_string).collect();
        f.debug_struct("StackError")
            .field("status_code", &self.status_code())
            .field("origin", &format_args!("{}", self.origin))
            .field("notes", &notes)
            .finish()
    }
}

/// Most recent note first, origin last: `outer: inner: origin`.
impl fmt::Display for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for note in self.notes.iter().rev() {
            write!(f, "{}: ", note.message)?;
        }
        write!(f, "{}", self.origin)
    }
}

impl Error for StackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.origin)
    }
}

impl<E: ErrorExt> From<E> for StackError {
    fn from(e: E) -> Self {
        StackError::new(e)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
