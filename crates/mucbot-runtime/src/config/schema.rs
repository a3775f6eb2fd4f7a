//! The resolved bot configuration.
//!
//! [`BotConfig`] is the typed view of a [`Config`](super::Config) chain: the
//! ten recognized options as fields plus an [`extra`](BotConfig::extra) map
//! for everything else.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ConfigError, ConfigResult};

/// A flat mapping of option names to values.
pub type Settings = serde_json::Map<String, Value>;

/// Names of the recognized options, in declaration order.
pub const OPTIONS: [&str; 10] = [
    "login",
    "password",
    "nick",
    "server",
    "channel",
    "channel_password",
    "resource",
    "log_level",
    "log_file",
    "debug",
];

/// Returns the canonical name of a recognized option.
///
/// `channelpw` is accepted as a spelling of `channel_password`.
pub fn canonical_option(name: &str) -> Option<&'static str> {
    if name == "channelpw" {
        return Some("channel_password");
    }
    OPTIONS.iter().copied().find(|option| *option == name)
}

// ============================================================================
// Log Level
// ============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    /// Accepted for compatibility; logs like [`LogLevel::Error`].
    Fatal,
}

impl LogLevel {
    pub const VALID: [&'static str; 6] = ["trace", "debug", "info", "warn", "error", "fatal"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error | Self::Fatal => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            _ => Err(ConfigError::validation(format!(
                "Invalid log level: {s}. Valid values are: {:?}",
                Self::VALID
            ))),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, ConfigError> {
        value.parse()
    }
}

// ============================================================================
// Bot Config
// ============================================================================

/// Typed bot configuration with defaults applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Account address, `user@host`, without a resource.
    #[serde(default)]
    pub login: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Nickname used in the room.
    #[serde(default = "default_nick")]
    pub nick: String,

    /// Conference server hosting the room.
    #[serde(default)]
    pub server: Option<String>,

    /// Room name on [`server`](Self::server).
    #[serde(default)]
    pub channel: Option<String>,

    #[serde(default)]
    pub channel_password: Option<String>,

    /// Resource label of the session.
    #[serde(default = "default_resource")]
    pub resource: String,

    #[serde(default)]
    pub log_level: LogLevel,

    /// Log destination; stdout when unset.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enables transport-level tracing.
    #[serde(default)]
    pub debug: bool,

    /// Options that are not recognized by the runtime itself.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_nick() -> String {
    "mucbot".to_string()
}

fn default_resource() -> String {
    "mucbot".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            login: None,
            password: None,
            nick: default_nick(),
            server: None,
            channel: None,
            channel_password: None,
            resource: default_resource(),
            log_level: LogLevel::default(),
            log_file: None,
            debug: false,
            extra: BTreeMap::new(),
        }
    }
}

impl BotConfig {
    /// Builds a config from a flat settings map.
    ///
    /// `null` values count as not supplied, so the default applies.
    pub fn from_settings(settings: &Settings) -> ConfigResult<Self> {
        let supplied: Settings = settings
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| {
                let key = canonical_option(key).map_or_else(|| key.clone(), str::to_string);
                (key, value.clone())
            })
            .collect();

        Ok(serde_json::from_value(Value::Object(supplied))?)
    }

    /// Returns the room address, `channel@server`, when both are set.
    pub fn room(&self) -> Option<String> {
        match (&self.channel, &self.server) {
            (Some(channel), Some(server)) => Some(format!("{channel}@{server}")),
            _ => None,
        }
    }

    /// Looks up an extra option.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Returns the built-in defaults of the recognized options.
pub fn default_settings() -> Settings {
    let mut settings = Settings::new();
    settings.insert("login".into(), Value::Null);
    settings.insert("password".into(), Value::Null);
    settings.insert("nick".into(), Value::from(default_nick()));
    settings.insert("server".into(), Value::Null);
    settings.insert("channel".into(), Value::Null);
    settings.insert("channel_password".into(), Value::Null);
    settings.insert("resource".into(), Value::from(default_resource()));
    settings.insert("log_level".into(), Value::from(LogLevel::default().as_str()));
    settings.insert("log_file".into(), Value::Null);
    settings.insert("debug".into(), Value::Bool(false));
    settings
}
