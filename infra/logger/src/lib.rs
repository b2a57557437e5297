//! # Logger
//!
//! Installs the process-wide `tracing` subscriber: compact console output, optional
//! rolling file output (plain or JSON) written through a non-blocking worker, and
//! `EnvFilter`-based level control.
//!
//! ## Example
//!
//! ```rust
//! # use mshield_logger::{Logger, LevelFilter};
//! let _logger = Logger::builder()
//!     .name("mshield")
//!     .console(true)
//!     .level(LevelFilter::DEBUG)
//!     .init()
//!     .unwrap();
//! ```
//!
//! Applications normally go through [`Logger::from_config`] with the `logging`
//! section of the shield configuration.

mod builder;
mod error;

pub use crate::builder::{LoggerBuilder, NoFile, NoName, WithFile, WithName};
pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use mshield_domain::config::LoggingConfig;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;

pub(crate) const LOG_FILE_SUFFIX: &str = "log";

/// Handle to the installed logging system.
///
/// Holds the background writer guard; drop it only at shutdown.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    /// Starts a [`LoggerBuilder`]. The name prefixes rolling files (`mshield.2024-05-01.log`).
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Installs the subscriber described by a [`LoggingConfig`].
    ///
    /// # Errors
    /// Fails for an unknown level name and for every [`LoggerBuilder::init`] error.
    pub fn from_config(config: &LoggingConfig) -> Result<Self, LoggerError> {
        let level = parse_level(&config.level)?;
        let builder = Logger::builder().name(&config.name).console(config.console).level(level);
        let builder = match &config.env_filter {
            Some(filter) => builder.env_filter(filter),
            None => builder,
        };

        match &config.directory {
            Some(directory) => {
                let builder = builder.path(directory).max_files(config.max_files);
                if config.json { builder.json().init() } else { builder.init() }
            }
            None => builder.init(),
        }
    }

    pub(crate) const fn new(guard: Option<WorkerGuard>) -> Self {
        Self { guard }
    }

    /// Closes the file writer and blocks until its queued lines are on disk.
    ///
    /// Later events only reach the console. Returns `false` when there was no file
    /// writer left to flush.
    pub fn flush(&mut self) -> bool {
        if self.guard.is_none() {
            return false;
        }
        tracing::info!("Flushing file log writer");
        drop(self.guard.take());
        true
    }

    #[must_use]
    pub const fn guard(&self) -> Option<&WorkerGuard> {
        self.guard.as_ref()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

/// Parses `trace`, `debug`, `info`, `warn`, `error` or `off` (case-insensitive).
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggerError> {
    LevelFilter::from_str(level.trim()).map_err(|_| LoggerError::InvalidConfiguration {
        message: format!("Unknown log level '{level}'").into(),
        context: None,
    })
}
