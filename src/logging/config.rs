use std::{collections::BTreeMap, fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use super::LoggingError;

/// Accepted values of [`LoggingConfig::level`].
pub const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Output format of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Rotation period of the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Never,
    Hourly,
    #[default]
    Daily,
}

/// File sink, written through a non-blocking writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub dir: PathBuf,
    pub prefix: String,
    pub rotation: Rotation,
    /// File format; json when unset.
    pub format: Option<LogFormat>,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level: trace, debug, info, warn, error or off.
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    /// Per-target levels, e.g. `flexlink::adapter = "debug"`.
    pub targets: BTreeMap<String, String>,
    pub file: Option<FileConfig>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            prefix: "flexlink.log".to_string(),
            rotation: Rotation::default(),
            format: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            with_ansi: true,
            with_target: true,
            targets: BTreeMap::new(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds the `EnvFilter` directive: the base level, then the target
    /// levels.
    pub fn build_filter_directive(&self) -> String {
        let mut directive = self.level.to_lowercase();
        for (target, level) in &self.targets {
            directive.push(',');
            directive.push_str(target);
            directive.push('=');
            directive.push_str(&level.to_lowercase());
        }
        directive
    }

    pub fn validate(&self) -> Result<(), LoggingError> {
        check_level(&self.level)?;
        for level in self.targets.values() {
            check_level(level)?;
        }
        if let Some(file) = &self.file {
            if file.prefix.trim().is_empty() {
                return Err(LoggingError::InvalidFile(
                    "file prefix must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn check_level(level: &str) -> Result<(), LoggingError> {
    let lower = level.to_lowercase();
    if LEVELS.contains(&lower.as_str()) {
        Ok(())
    } else {
        Err(LoggingError::InvalidLevel(level.to_string()))
    }
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        };
        f.write_str(s)
    }
}
