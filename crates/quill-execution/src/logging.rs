//! Global subscriber setup.
//!
//! `QUILL_LOG` takes `EnvFilter` directives and overrides the configured
//! level, e.g. `QUILL_LOG=quill_application=debug,quill::action=info`.

use crate::action_layer::ActionEventLayer;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "QUILL_LOG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Where formatted log lines go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogTarget {
    #[default]
    Stderr,
    /// Appends to a file, creating parent directories as needed.
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    pub target: LogTarget,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            target: LogTarget::default(),
        }
    }
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log directive: {0}")]
    Directive(#[from] tracing_subscriber::filter::ParseError),

    #[error("cannot open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

impl LoggingConfig {
    /// The filter: `QUILL_LOG` when set, otherwise the configured level.
    pub fn filter(&self) -> Result<EnvFilter, LoggingError> {
        match std::env::var(LOG_ENV) {
            Ok(directives) if !directives.trim().is_empty() => Ok(EnvFilter::try_new(directives)?),
            _ => Ok(EnvFilter::try_new(self.level.to_string().to_ascii_lowercase())?),
        }
    }

    fn writer(&self) -> Result<BoxMakeWriter, LoggingError> {
        match &self.target {
            LogTarget::Stderr => Ok(BoxMakeWriter::new(std::io::stderr)),
            LogTarget::File(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Ok(BoxMakeWriter::new(Mutex::new(file)))
            }
        }
    }
}

/// Installs the global subscriber.
///
/// `actions`, when given, receives every `quill::action` event regardless of
/// the filter's level for other targets. Fails if a subscriber is already
/// installed.
pub fn init_logging(
    config: &LoggingConfig,
    actions: Option<ActionEventLayer>,
) -> Result<(), LoggingError> {
    let filter = config.filter()?.add_directive("quill::action=info".parse()?);
    let writer = config.writer()?;
    let ansi = config.target == LogTarget::Stderr;
    let registry = tracing_subscriber::registry().with(filter).with(actions);

    match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(writer).with_ansi(ansi))
            .try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init()?,
    }

    Ok(())
}
