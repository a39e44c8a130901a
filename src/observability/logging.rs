//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Apply the configured log level once config is loaded
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - The filter is installed behind a reload layer so the level from
//!   config can replace the bootstrap level (RUST_LOG or "info")

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};
use thiserror::Error;

/// Errors raised while setting up logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level '{0}'")]
    InvalidLevel(String),

    #[error("global subscriber already installed")]
    AlreadyInitialized,

    #[error("failed to apply log level: {0}")]
    Reload(#[from] reload::Error),
}

/// Handle used to change the level of the installed subscriber.
#[derive(Clone)]
pub struct LogHandle {
    inner: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// Replace the active filter with `level`.
    pub fn set_level(&self, level: &str) -> Result<(), LoggingError> {
        let level = parse_level(level)?;
        self.inner.reload(EnvFilter::default().add_directive(level.into()))?;
        Ok(())
    }
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle").finish_non_exhaustive()
    }
}

/// Parse a level name such as `info` or `DEBUG`.
///
/// `warning` is read as `warn`; `fatal` and `panic` have no tracing
/// counterpart and map to `error`.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    let name = level.trim().to_ascii_lowercase();
    let name = match name.as_str() {
        "warning" => "warn",
        "fatal" | "panic" => "error",
        other => other,
    };
    name.parse::<LevelFilter>()
        .map_err(|_| LoggingError::InvalidLevel(level.to_string()))
}

/// Install the global subscriber with a reloadable filter.
pub fn init() -> Result<LogHandle, LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let (filter, inner) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(LogHandle { inner })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("info").unwrap(), LevelFilter::INFO);
        assert_eq!(parse_level("DEBUG").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_level(" warn ").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_level("off").unwrap(), LevelFilter::OFF);
    }

    #[test]
    fn test_parse_level_accepts_logrus_names() {
        assert_eq!(parse_level("warning").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_level("Fatal").unwrap(), LevelFilter::ERROR);
        assert_eq!(parse_level("panic").unwrap(), LevelFilter::ERROR);
    }

    #[test]
    fn test_parse_level_rejects_unknown() {
        let err = parse_level("chatty").unwrap_err();
        assert_eq!(err.to_string(), "invalid log level 'chatty'");
    }
}
