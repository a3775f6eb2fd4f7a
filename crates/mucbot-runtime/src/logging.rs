//! Logging setup on top of `tracing` and `tracing-subscriber`.
//!
//! # From a bot configuration
//!
//! ```rust,ignore
//! use mucbot_runtime::logging;
//!
//! let config = ConfigLoader::new().load_bot_config()?;
//! logging::init_from_config(&config)?;
//! ```
//!
//! `log_level` sets the base level, `log_file` redirects output to a file
//! (appended to, never rotated) and `debug = true` turns on tracing of the
//! runtime and transport. `RUST_LOG` replaces the base level when set.
//!
//! # Manual
//!
//! ```rust,ignore
//! use mucbot_runtime::logging::{LogFormat, LoggingBuilder, SpanEvents};
//!
//! LoggingBuilder::new()
//!     .directive("mucbot_core=debug")
//!     .format(LogFormat::Pretty)
//!     .span_events(SpanEvents::LIFECYCLE)
//!     .init();
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{BotConfig, ConfigError, ConfigResult};

/// Directive added when the `debug` option is on.
pub const DEBUG_DIRECTIVE: &str = "mucbot_runtime=trace";

/// Default file name when a log path has no file component.
const DEFAULT_LOG_FILE: &str = "mucbot.log";

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanEvents {
    pub new: bool,
    pub close: bool,
}

impl SpanEvents {
    /// No span events will be logged.
    pub const NONE: Self = Self {
        new: false,
        close: false,
    };

    /// Log span creation and close, e.g. one pair per dispatched event.
    pub const LIFECYCLE: Self = Self {
        new: true,
        close: true,
    };

    fn to_fmt_span(self) -> fmt::format::FmtSpan {
        let mut span = fmt::format::FmtSpan::NONE;
        if self.new {
            span |= fmt::format::FmtSpan::NEW;
        }
        if self.close {
            span |= fmt::format::FmtSpan::CLOSE;
        }
        span
    }
}

/// Line format of log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Newline-delimited JSON (requires the `json-log` feature).
    #[cfg(feature = "json-log")]
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Appended to the given file.
    File(PathBuf),
}

/// Errors from installing the global subscriber.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// The log file or its directory could not be opened.
    #[error("Failed to open log file: {0}")]
    LogFile(#[from] InitError),

    /// A global subscriber is already installed.
    #[error(transparent)]
    AlreadyInitialized(#[from] TryInitError),
}

/// Initializes logging from a bot configuration.
///
/// An already installed global subscriber is kept. An unusable `log_file`
/// is reported as [`ConfigError::LogFile`].
pub fn init_from_config(config: &BotConfig) -> ConfigResult<()> {
    match LoggingBuilder::from_config(config).try_init() {
        Ok(()) | Err(LoggingError::AlreadyInitialized(_)) => Ok(()),
        Err(LoggingError::LogFile(source)) => Err(ConfigError::LogFile {
            path: config.log_file.clone().unwrap_or_default(),
            source,
        }),
    }
}

/// A builder for configuring logging.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    level: tracing::Level,
    span_events: SpanEvents,
    format: LogFormat,
    output: LogOutput,
    with_target: bool,
    with_thread_ids: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// Creates a builder logging at `info` to stdout.
    pub fn new() -> Self {
        Self {
            directives: Vec::new(),
            level: tracing::Level::INFO,
            span_events: SpanEvents::NONE,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            with_target: true,
            with_thread_ids: false,
        }
    }

    /// Creates a builder from the logging options of `config`.
    pub fn from_config(config: &BotConfig) -> Self {
        let mut builder = Self::new().with_level(config.log_level.to_tracing_level());

        if let Some(path) = &config.log_file {
            builder = builder.output(LogOutput::File(path.clone()));
        }
        if config.debug {
            builder = builder.directive(DEBUG_DIRECTIVE);
        }

        builder
    }

    /// Set the base log level.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    /// Add a filter directive such as `mucbot_core=debug`.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Include the target (module path) in log output.
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.with_thread_ids = enabled;
        self
    }

    pub fn level(&self) -> tracing::Level {
        self.level
    }

    pub fn directives(&self) -> &[String] {
        &self.directives
    }

    pub fn log_output(&self) -> &LogOutput {
        &self.output
    }

    /// Build the filter from `RUST_LOG` or the base level, plus directives.
    fn build_filter(&self) -> EnvFilter {
        let base_filter = self.level.to_string().to_lowercase();
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&base_filter));

        for directive in &self.directives {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }

        filter
    }

    /// Initialize the logging system, ignoring an existing subscriber or an
    /// unusable log file.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Try to initialize the logging system, returning an error on failure.
    pub fn try_init(self) -> Result<(), LoggingError> {
        let filter = self.build_filter();
        let span_events = self.span_events.to_fmt_span();

        macro_rules! configure_layer {
            ($layer:expr) => {
                $layer
                    .with_span_events(span_events.clone())
                    .with_target(self.with_target)
                    .with_thread_ids(self.with_thread_ids)
            };
        }

        macro_rules! init_with_writer {
            ($writer:expr, $ansi:expr) => {
                match self.format {
                    #[cfg(feature = "json-log")]
                    LogFormat::Json => tracing_subscriber::registry()
                        .with(
                            fmt::layer()
                                .json()
                                .with_span_events(span_events.clone())
                                .with_writer($writer),
                        )
                        .with(filter)
                        .try_init(),
                    LogFormat::Compact => tracing_subscriber::registry()
                        .with(configure_layer!(
                            fmt::layer().compact().with_ansi($ansi).with_writer($writer)
                        ))
                        .with(filter)
                        .try_init(),
                    LogFormat::Full => tracing_subscriber::registry()
                        .with(configure_layer!(
                            fmt::layer().with_ansi($ansi).with_writer($writer)
                        ))
                        .with(filter)
                        .try_init(),
                    LogFormat::Pretty => tracing_subscriber::registry()
                        .with(configure_layer!(
                            fmt::layer().pretty().with_ansi($ansi).with_writer($writer)
                        ))
                        .with(filter)
                        .try_init(),
                }
            };
        }

        let installed = match &self.output {
            LogOutput::Stdout => init_with_writer!(std::io::stdout, true),
            LogOutput::Stderr => init_with_writer!(std::io::stderr, true),
            LogOutput::File(path) => {
                let appender = file_appender(path)?;
                init_with_writer!(appender, false)
            }
        };
        Ok(installed?)
    }
}

/// Opens `path` for appending, creating its directory when missing.
fn file_appender(path: &Path) -> Result<RollingFileAppender, InitError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map_or_else(|| DEFAULT_LOG_FILE.to_string(), |n| n.to_string_lossy().into_owned());

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
}
