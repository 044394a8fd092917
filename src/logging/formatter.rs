use std::io;

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, registry::LookupSpan, Layer};

use super::{
    config::{FileConfig, LogFormat, Rotation},
    LoggingConfig, LoggingError,
};

pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Console layer (stdout) in the configured format.
pub fn console_layer<S>(config: &LoggingConfig) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(config.with_ansi)
        .with_target(config.with_target);

    match config.format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().with_current_span(true).boxed(),
    }
}

/// Rotating file layer. Keep the guard alive while logs are written.
pub fn file_layer<S>(
    file: &FileConfig,
    with_target: bool,
) -> Result<(BoxedLayer<S>, WorkerGuard), LoggingError>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    std::fs::create_dir_all(&file.dir)?;

    let rotation = match file.rotation {
        Rotation::Never => rolling::Rotation::NEVER,
        Rotation::Hourly => rolling::Rotation::HOURLY,
        Rotation::Daily => rolling::Rotation::DAILY,
    };
    let appender = rolling::RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&file.prefix)
        .build(&file.dir)?;
    let (writer, guard) = non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(with_target);

    let layer = match file.format.unwrap_or(LogFormat::Json) {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().boxed(),
    };
    Ok((layer, guard))
}
