//! Configuration for the mucbot runtime.
//!
//! - [`Config`] - layered key-value settings, last layer added wins
//! - [`BotConfig`] - the typed, defaulted view of a resolved chain
//! - [`ConfigLoader`] - builds a chain from defaults, files and environment
//! - [`validate_config`] - startup checks on the account and room

pub mod chain;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use chain::Config;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{BotConfig, LogLevel, OPTIONS, Settings, default_settings};
pub use validation::validate_config;
