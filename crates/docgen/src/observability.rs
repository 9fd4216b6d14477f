//! # Observability
//!
//! Installs the global `tracing` subscriber used by the CLI and by embedders
//! that want the workflow's stage and section spans printed.
//!
//! `RUST_LOG` is honored; the configured level is added on top as a directive
//! for this crate only, so `RUST_LOG=reqwest=debug` still works next to it.

use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Configuration for initializing the observability system.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// The maximum log level captured for `docgen` targets.
    pub level: Level,
    /// Where log lines go.
    pub target: LogTarget,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            target: LogTarget::default(),
        }
    }
}

impl ObservabilityConfig {
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    fn filter_directive(&self) -> String {
        format!("docgen={}", self.level)
    }
}

/// Defines the output target for logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogTarget {
    /// Log to stderr, keeping stdout free for the report.
    #[default]
    Console,
    /// Log to a file.
    File(String),
}

/// Initializes the global tracing subscriber.
///
/// Call once, at the start of `main`. Fails if the directive cannot be parsed,
/// the log file cannot be created, or a global subscriber is already set.
pub fn init(config: ObservabilityConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::from_default_env().add_directive(config.filter_directive().parse()?);

    let subscriber = tracing_subscriber::registry().with(filter);

    match config.target {
        LogTarget::Console => {
            let layer = fmt::layer().with_writer(std::io::stderr);
            subscriber.with(layer).try_init()?;
        }
        LogTarget::File(path) => {
            let file = std::fs::File::create(path)?;
            let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
            subscriber.with(layer).try_init()?;
        }
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.target, LogTarget::Console);
    }

    #[test]
    fn test_filter_directive_targets_crate() {
        let config = ObservabilityConfig::default().with_level(Level::DEBUG);
        assert_eq!(config.filter_directive(), "docgen=DEBUG");
        assert!(config.filter_directive().parse::<tracing_subscriber::filter::Directive>().is_ok());
    }
}
