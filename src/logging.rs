//! Structured logging setup on `tracing-subscriber`.
//!
//! Configured from `RSRV_LOG_*` environment variables; `RUST_LOG`, when set,
//! takes precedence over `RSRV_LOG_LEVEL`.

use anyhow::{Context, Result};
use std::env;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Write through a background thread (`tracing-appender`)
    pub async_logging: bool,
    /// Extra comma-separated `EnvFilter` directives
    pub target_filter: Option<String>,
    /// Include file:line in every event
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: true,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Read `RSRV_LOG_LEVEL`, `RSRV_LOG_FORMAT`, `RSRV_LOG_ASYNC`,
    /// `RSRV_LOG_TARGET_FILTER` and `RSRV_LOG_INCLUDE_LOCATION`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`LogConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default)
        };
        Self {
            log_level: lookup("RSRV_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("RSRV_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            async_logging: flag("RSRV_LOG_ASYNC", defaults.async_logging),
            target_filter: lookup("RSRV_LOG_TARGET_FILTER").filter(|s| !s.trim().is_empty()),
            include_location: flag("RSRV_LOG_INCLUDE_LOCATION", defaults.include_location),
        }
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let level = match self.log_level.to_lowercase().as_str() {
            l @ ("trace" | "debug" | "info" | "warn" | "error") => l.to_string(),
            _ => "info".to_string(),
        };
        let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        filter = filter.add_directive(
            "may_minihttp=warn"
                .parse()
                .context("built-in log directive")?,
        );
        if let Some(extra) = &self.target_filter {
            for directive in extra.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                filter = filter.add_directive(
                    directive
                        .parse()
                        .with_context(|| format!("invalid log filter directive `{directive}`"))?,
                );
            }
        }
        Ok(filter)
    }
}

/// Keeps the background log writer alive; buffered events are flushed on drop.
#[must_use = "dropping the guard stops asynchronous logging"]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Fails on an invalid filter directive or when a global subscriber is
/// already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<LoggingGuard> {
    let filter = config.env_filter()?;

    let (writer, worker) = if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        (BoxMakeWriter::new(non_blocking), Some(guard))
    } else {
        (BoxMakeWriter::new(std::io::stdout), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("failed to install the global log subscriber")?;

    Ok(LoggingGuard { _worker: worker })
}

/// [`init_logging_with_config`] with [`LogConfig::from_env`].
pub fn init_logging() -> Result<LoggingGuard> {
    init_logging_with_config(&LogConfig::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("invalid"), LogFormat::Json);
    }

    #[test]
    fn defaults_without_variables() {
        assert_eq!(LogConfig::from_lookup(|_| None), LogConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = LogConfig::from_lookup(lookup(&[
            ("RSRV_LOG_LEVEL", "debug"),
            ("RSRV_LOG_FORMAT", "pretty"),
            ("RSRV_LOG_ASYNC", "false"),
            ("RSRV_LOG_TARGET_FILTER", "resource_server::store=trace"),
            ("RSRV_LOG_INCLUDE_LOCATION", "true"),
        ]));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.async_logging);
        assert_eq!(
            config.target_filter.as_deref(),
            Some("resource_server::store=trace")
        );
        assert!(config.include_location);
    }

    #[test]
    fn unparsable_flags_keep_defaults() {
        let config = LogConfig::from_lookup(lookup(&[("RSRV_LOG_ASYNC", "sometimes")]));
        assert!(config.async_logging);
    }

    #[test]
    fn invalid_directive_is_an_error() {
        let config = LogConfig {
            target_filter: Some("=[".to_string()),
            ..LogConfig::default()
        };
        assert!(config.env_filter().is_err());
    }
}
