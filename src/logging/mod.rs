//! Structured logging on top of `tracing`.
//!
//! - `config`: levels, format, file sink.
//! - `filters`: `EnvFilter` from the configuration or `RUST_LOG`.
//! - `formatter`: console and file layers.
//! - `handle`: guards of the non-blocking writers.

pub mod config;
mod filters;
pub mod formatter;
pub mod handle;

pub use config::{FileConfig, LogFormat, LoggingConfig, Rotation};
pub use handle::LoggingHandle;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unknown log level '{0}'")]
    InvalidLevel(String),

    #[error("unknown log format '{0}'")]
    InvalidFormat(String),

    #[error("invalid file sink: {0}")]
    InvalidFile(String),

    #[error("invalid filter directive '{directive}': {source}")]
    InvalidDirective {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("cannot create log file appender: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("global subscriber already set: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs the global subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingHandle, LoggingError> {
    config.validate()?;
    let filter = filters::build_filter(config)?;

    let mut layers = vec![formatter::console_layer::<Registry>(config)];
    let file_guard = match &config.file {
        Some(file) => {
            let (layer, guard) = formatter::file_layer::<Registry>(file, config.with_target)?;
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        format = %config.format,
        file = config.file.as_ref().map(|f| f.dir.display().to_string()),
        "logging initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
