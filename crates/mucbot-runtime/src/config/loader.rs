//! Configuration loader using figment.
//!
//! Every source becomes one layer of a [`Config`] chain, added from lowest to
//! highest priority so that later sources win:
//!
//! 1. Built-in defaults
//! 2. Config file (`mucbot.toml` / `mucbot.yaml` / `mucbot.yml`)
//! 3. Environment variables (`MUCBOT_*`)
//! 4. Programmatic overrides, in the order they were given
//!
//! # Feature Flags
//!
//! - `toml-config`: enables `mucbot.toml`
//! - `yaml-config`: enables `mucbot.yaml` and `mucbot.yml`
//!
//! With both enabled, the first file found is used, TOML before YAML.
//!
//! # Environment Variables
//!
//! The prefix is stripped and the rest lowercased:
//!
//! - `MUCBOT_NICK=helper` → `nick = "helper"`
//! - `MUCBOT_DEBUG=true` → `debug = true`
//! - `MUCBOT_GREETING=hi` → extra option `greeting = "hi"`
//!
//! # Example
//!
//! ```rust,ignore
//! use mucbot_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./deploy/mucbot.toml")
//!     .set("nick", "helper")
//!     .load()?;
//!
//! let bot_config = config.bot_config()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::Env;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use super::chain::Config;
use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, Settings};

/// Default prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "MUCBOT_";

/// Base name of configuration files.
pub const FILE_STEM: &str = "mucbot";

/// Builder that gathers configuration sources into a [`Config`] chain.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths for configuration files.
    search_paths: Vec<PathBuf>,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
    /// Environment variable prefix, `None` to skip the environment.
    env_prefix: Option<String>,
    /// Programmatic layers, applied last.
    overrides: Vec<Config>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader that searches the default locations and reads
    /// `MUCBOT_*` variables.
    pub fn new() -> Self {
        Self {
            search_paths: Vec::new(),
            config_file: None,
            env_prefix: Some(ENV_PREFIX.to_string()),
            overrides: Vec::new(),
        }
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Adds the user config directory (`~/.config/mucbot` on Linux).
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join(FILE_STEM)),
            None => self,
        }
    }

    /// Sets a specific configuration file to load.
    ///
    /// Loading fails if the file does not exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Reads environment variables with the given prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Adds a programmatic layer on top of all other sources.
    pub fn merge(mut self, layer: impl Into<Config>) -> Self {
        self.overrides.push(layer.into());
        self
    }

    /// Adds a single-option programmatic layer.
    pub fn set(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut settings = Settings::new();
        settings.insert(key.into(), value.into());
        self.merge(settings)
    }

    /// Loads every source and returns the chain.
    pub fn load(self) -> ConfigResult<Config> {
        let mut config = Config::defaults();

        if let Some(path) = self.find_file()? {
            info!(path = %path.display(), "Loading configuration file");
            config.push(Self::read_file(&path)?);
        } else {
            warn!("No configuration file found, using defaults");
        }

        if let Some(prefix) = &self.env_prefix {
            trace!(prefix = %prefix, "Loading environment variables");
            let settings: Settings = Figment::from(Env::prefixed(prefix)).extract()?;
            if !settings.is_empty() {
                debug!(count = settings.len(), "Applied environment overrides");
            }
            config.push(settings);
        }

        for layer in self.overrides {
            config.push(layer);
        }

        debug!(layers = config.layers().len(), "Configuration loaded");
        Ok(config)
    }

    /// Loads every source and resolves the typed configuration.
    pub fn load_bot_config(self) -> ConfigResult<BotConfig> {
        self.load()?.bot_config()
    }

    /// Returns the file to load, if any.
    fn find_file(&self) -> ConfigResult<Option<PathBuf>> {
        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            return Ok(Some(path.clone()));
        }

        for dir in self.resolve_search_paths() {
            for name in Self::file_names() {
                let candidate = dir.join(name);
                if candidate.exists() {
                    return Ok(Some(candidate));
                }
            }
        }
        Ok(None)
    }

    /// Reads a single config file, dispatching on its extension.
    fn read_file(path: &Path) -> ConfigResult<Settings> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let figment: Figment = match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Figment::from(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Figment::from(Yaml::file(path)),
            _ => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
        };
        Ok(figment.extract()?)
    }

    /// File names tried in each search path, per enabled format.
    fn file_names() -> Vec<String> {
        #[allow(unused_mut)]
        let mut names = Vec::new();
        #[cfg(feature = "toml-config")]
        names.push(format!("{FILE_STEM}.toml"));
        #[cfg(feature = "yaml-config")]
        {
            names.push(format!("{FILE_STEM}.yaml"));
            names.push(format!("{FILE_STEM}.yml"));
        }
        names
    }

    /// Resolves the effective list of search paths.
    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }

        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(FILE_STEM));
        }
        paths
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use serde_json::json;

    #[test]
    fn test_defaults_only() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load_bot_config()
                .unwrap();

            assert_eq!(config, BotConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("MUCBOT_NICK", "helper");
            jail.set_env("MUCBOT_DEBUG", "true");
            jail.set_env("MUCBOT_GREETING", "hi");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load_bot_config()
                .unwrap();

            assert_eq!(config.nick, "helper");
            assert!(config.debug);
            assert_eq!(config.extra("greeting"), Some(&json!("hi")));
            Ok(())
        });
    }

    #[test]
    fn test_overrides_beat_env() {
        Jail::expect_with(|jail| {
            jail.set_env("MUCBOT_NICK", "from-env");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .set("nick", "first")
                .set("nick", "second")
                .load()
                .unwrap();

            assert_eq!(config.get("nick"), Some(json!("second")));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = ConfigLoader::new()
            .without_env()
            .file("/definitely/not/here/mucbot.toml")
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        Jail::expect_with(|jail| {
            jail.create_file("mucbot.ini", "nick = helper")?;

            let result = ConfigLoader::new().without_env().file("mucbot.ini").load();
            assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"));
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_toml_file_between_defaults_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "mucbot.toml",
                r#"
                    login = "bot@example.org"
                    nick = "from-file"
                    channel = "lounge"
                    server = "conference.example.org"
                "#,
            )?;
            jail.set_env("MUCBOT_NICK", "from-env");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load_bot_config()
                .unwrap();

            assert_eq!(config.login.as_deref(), Some("bot@example.org"));
            assert_eq!(config.nick, "from-env");
            assert_eq!(config.room().as_deref(), Some("lounge@conference.example.org"));
            assert_eq!(config.resource, "mucbot");
            Ok(())
        });
    }

    #[cfg(feature = "yaml-config")]
    #[test]
    fn test_yaml_file() {
        Jail::expect_with(|jail| {
            jail.create_file("mucbot.yaml", "nick: yaml-bot\nlog_level: debug\n")?;

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load_bot_config()
                .unwrap();

            assert_eq!(config.nick, "yaml-bot");
            assert_eq!(config.log_level.as_str(), "debug");
            Ok(())
        });
    }
}
