use flexlink_error::{LogLevel, StackError};

/// Logs `error` at the level its status code maps to, with its tags attached.
pub fn report(
    error: &StackError,
    message: &str,
) {
    let status = error.status_code();
    let tags = error.metrics_tags();
    match error.log_level() {
        LogLevel::Error => tracing::error!(error = %error, %status, ?tags, "{message}"),
        LogLevel::Warn => tracing::warn!(error = %error, %status, ?tags, "{message}"),
        LogLevel::Info => tracing::info!(error = %error, %status, ?tags, "{message}"),
        LogLevel::Debug => tracing::debug!(error = %error, %status, ?tags, "{message}"),
        LogLevel::Trace => tracing::trace!(error = %error, %status, ?tags, "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use flexlink_error::{BrokerError, LifecycleError, ResourceError};
    use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, registry::Registry};

    use super::*;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Buffer {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture(
        max: LevelFilter,
        error: &StackError,
    ) -> String {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let layer = fmt::layer()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .with_filter(max);
        let subscriber = Registry::default().with(layer);

        tracing::subscriber::with_default(subscriber, || report(error, "request failed"));

        let out = buffer.0.lock().unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    fn test_resource_failures_log_as_error() {
        let error = StackError::new(LifecycleError::ResourceInitialization {
            destination: "quotes".to_string(),
            source: ResourceError::Failed("no channel".to_string()),
        });

        let out = capture(LevelFilter::ERROR, &error);
        assert!(out.contains("ERROR"), "got: {out}");
        assert!(out.contains("request failed"), "got: {out}");
        assert!(out.contains("quotes"), "got: {out}");
    }

    #[test]
    fn test_denials_log_as_warn() {
        let error = StackError::new(BrokerError::Unauthorized {
            destination: "admin".to_string(),
        });

        assert!(capture(LevelFilter::ERROR, &error).is_empty());
        let out = capture(LevelFilter::WARN, &error);
        assert!(out.contains("WARN"), "got: {out}");
        assert!(out.contains("Unauthorized (3002)"), "got: {out}");
    }

    #[test]
    fn test_lookup_misses_stay_at_debug() {
        let error = StackError::new(BrokerError::DestinationNotFound {
            destination: "nope".to_string(),
        });

        assert!(capture(LevelFilter::INFO, &error).is_empty());
        assert!(capture(LevelFilter::DEBUG, &error).contains("DEBUG"));
    }
}
