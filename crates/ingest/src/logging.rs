//! Logging configuration and initialization.
//!
//! Library code only emits `tracing` events; binaries and tests decide where
//! they go by calling [`init_logging`] once at startup.
//!
//! # Example
//!
//! ```no_run
//! use ingest::logging::{LogSettings, init_logging};
//!
//! let settings = LogSettings::from_env().unwrap();
//! init_logging(&settings).unwrap();
//! tracing::info!("ingestion service started");
//! ```

use ingest_core::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, fmt as layer_fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Minimum level of emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Very detailed trace-level logging.
    Trace,
    /// Per-batch and per-cache-lookup details.
    Debug,
    /// One line per ingestion.
    #[default]
    Info,
    /// Load failures and skipped rows.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Convert to a tracing [`Level`].
    #[must_use]
    pub const fn to_tracing_level(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(IngestError::InvalidParameter(format!("Invalid log level: {s}"))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(IngestError::InvalidParameter(format!("Invalid log format: {s}"))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Minimum level to display.
    pub level: LogLevel,
    /// Text or JSON output.
    pub format: LogFormat,
    /// Extra filter directives such as `ingest_cache=debug`.
    pub filter_directives: Option<String>,
}

impl LogSettings {
    /// Loads settings from `INGEST_LOG_LEVEL`, `INGEST_LOG_FORMAT` and `INGEST_LOG_FILTER`.
    ///
    /// # Errors
    /// Returns [`IngestError::InvalidParameter`] for unparseable values.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns [`IngestError::InvalidParameter`] for unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();
        if let Some(level) = lookup("INGEST_LOG_LEVEL") {
            settings.level = level.parse()?;
        }
        if let Some(format) = lookup("INGEST_LOG_FORMAT") {
            settings.format = format.parse()?;
        }
        settings.filter_directives = lookup("INGEST_LOG_FILTER");
        Ok(settings)
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` directives are honored on top of the configured level.
///
/// # Errors
/// Returns [`IngestError::InvalidParameter`] for bad filter directives, or
/// [`IngestError::Other`] if a global subscriber is already installed.
pub fn init_logging(settings: &LogSettings) -> Result<()> {
    let mut filter =
        EnvFilter::from_default_env().add_directive(settings.level.to_tracing_level().into());

    if let Some(directives) = &settings.filter_directives {
        for directive in directives.split(',').filter(|d| !d.trim().is_empty()) {
            filter = filter.add_directive(directive.trim().parse().map_err(|e| {
                IngestError::InvalidParameter(format!("Failed to parse filter directive: {e}"))
            })?);
        }
    }

    let layer = layer_fmt::layer().with_target(true);
    let registry = tracing_subscriber::registry().with(filter);
    match settings.format {
        LogFormat::Text => registry.with(layer).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    }
    .map_err(|e| IngestError::Other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_level_and_format_parsing() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<_, _> = [
            ("INGEST_LOG_LEVEL", "debug"),
            ("INGEST_LOG_FORMAT", "json"),
            ("INGEST_LOG_FILTER", "ingest_cache=trace"),
        ]
        .into_iter()
        .collect();
        let settings = LogSettings::from_lookup(|k| vars.get(k).map(ToString::to_string)).unwrap();
        assert_eq!(settings.level, LogLevel::Debug);
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.filter_directives.as_deref(), Some("ingest_cache=trace"));

        let defaults = LogSettings::from_lookup(|_| None).unwrap();
        assert_eq!(defaults, LogSettings::default());
    }

    #[test]
    fn test_init_twice_fails() {
        let settings = LogSettings {
            level: LogLevel::Warn,
            ..Default::default()
        };
        let _ = init_logging(&settings);
        assert!(init_logging(&settings).is_err());
    }
}
