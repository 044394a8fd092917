use tracing_appender::non_blocking::WorkerGuard;

/// Holds the guards of the non-blocking writers.
///
/// While the handle lives the file sink accepts events; dropping it flushes
/// the buffer to disk.
#[must_use = "dropping the handle flushes and closes the file sink"]
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self { file_guard }
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Explicit shutdown, flushes the file buffer.
    pub fn shutdown(mut self) {
        if let Some(guard) = self.file_guard.take() {
            tracing::debug!("flushing file log sink");
            drop(guard);
        }
    }
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("file_sink", &self.has_file_sink())
            .finish()
    }
}
