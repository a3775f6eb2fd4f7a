//! Layered configuration.
//!
//! A [`Config`] holds its own settings plus an ordered list of layers. The
//! resolved view starts from the own settings and merges each layer on top,
//! in the order the layers were added, so the **last** layer added wins:
//!
//! ```rust,ignore
//! use mucbot_runtime::config::Config;
//! use serde_json::json;
//!
//! let config = Config::defaults()
//!     .add(Config::from_value(json!({"nick": "helper"}))?)
//!     .add(Config::from_value(json!({"nick": "override"}))?);
//!
//! assert_eq!(config.get("nick"), Some(json!("override")));
//! ```
//!
//! Merging is shallow: a value in a later layer replaces the earlier value
//! for the same key as a whole, including `null`.

use serde_json::Value;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, Settings, canonical_option, default_settings};

/// An ordered stack of settings layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    settings: Settings,
    layers: Vec<Config>,
}

impl Config {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration whose own settings are `settings`.
    pub fn from_settings(settings: Settings) -> Self {
        Self {
            settings,
            layers: Vec::new(),
        }
    }

    /// Creates a configuration from a JSON object.
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        match value {
            Value::Object(settings) => Ok(Self::from_settings(settings)),
            other => Err(ConfigError::validation(format!(
                "Configuration layer must be an object, got: {other}"
            ))),
        }
    }

    /// Creates a configuration holding the built-in defaults.
    pub fn defaults() -> Self {
        Self::from_settings(default_settings())
    }

    /// Appends a layer and returns the configuration.
    pub fn add(mut self, layer: impl Into<Config>) -> Self {
        self.layers.push(layer.into());
        self
    }

    /// Appends a layer in place.
    pub fn push(&mut self, layer: impl Into<Config>) -> &mut Self {
        self.layers.push(layer.into());
        self
    }

    /// The settings set directly on this configuration.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The added layers, in insertion order.
    pub fn layers(&self) -> &[Config] {
        &self.layers
    }

    /// Returns the resolved value of `key`.
    ///
    /// Recognized options fall back to their built-in default when no layer
    /// supplies a value. Unknown keys that were never set give `None`.
    pub fn get(&self, key: &str) -> Option<Value> {
        let key = canonical_option(key).unwrap_or(key);
        let value = self.resolve().remove(key).filter(|value| !value.is_null());
        if value.is_some() || canonical_option(key).is_none() {
            return value;
        }

        default_settings()
            .remove(key)
            .filter(|value| !value.is_null())
    }

    /// Sets a recognized option on this configuration's own settings.
    ///
    /// Names outside the recognized set are rejected; use
    /// [`set_extra`](Self::set_extra) for those.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> ConfigResult<()> {
        let Some(option) = canonical_option(key) else {
            return Err(ConfigError::UnknownOption(key.to_string()));
        };
        self.settings.insert(option.to_string(), value.into());
        Ok(())
    }

    /// Sets an arbitrary option on this configuration's own settings.
    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.settings.insert(key.into(), value.into());
    }

    /// Flattens the chain into one mapping.
    ///
    /// Own settings first, then every layer's resolved settings merged on
    /// top in insertion order. Option aliases are folded into their
    /// canonical name per layer before merging, so the last layer wins
    /// whichever spelling it used.
    pub fn resolve(&self) -> Settings {
        let mut resolved = canonicalize(&self.settings);
        for layer in &self.layers {
            for (key, value) in layer.resolve() {
                resolved.insert(key, value);
            }
        }
        resolved
    }

    /// Resolves the chain into a typed [`BotConfig`] with defaults applied.
    pub fn bot_config(&self) -> ConfigResult<BotConfig> {
        BotConfig::from_settings(&self.resolve())
    }
}

/// Renames option aliases to their canonical name.
///
/// When a layer holds both spellings, the canonical one is kept.
fn canonicalize(settings: &Settings) -> Settings {
    let mut canonical = Settings::new();
    for (key, value) in settings {
        match canonical_option(key) {
            Some(option) if option != key => {
                canonical.entry(option).or_insert_with(|| value.clone());
            }
            _ => {
                canonical.insert(key.clone(), value.clone());
            }
        }
    }
    canonical
}

impl From<Settings> for Config {
    fn from(settings: Settings) -> Self {
        Self::from_settings(settings)
    }
}

impl From<&BotConfig> for Config {
    fn from(config: &BotConfig) -> Self {
        match serde_json::to_value(config) {
            Ok(Value::Object(settings)) => Self::from_settings(settings),
            _ => Self::new(),
        }
    }
}
