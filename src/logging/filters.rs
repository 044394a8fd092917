use tracing_subscriber::EnvFilter;

use super::{LoggingConfig, LoggingError};

/// `RUST_LOG` when set, otherwise the directive built from the configuration.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directive = config.build_filter_directive();
    EnvFilter::try_new(&directive).map_err(|source| LoggingError::InvalidDirective {
        directive,
        source,
    })
}
