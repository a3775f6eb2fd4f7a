//! mucbot runtime - running a bot against a chat session.
//!
//! This crate provides:
//! - The [`Bot`] itself: handler registration and the run loop
//! - Layered configuration (`Config`, `ConfigLoader`, `BotConfig`)
//! - The [`Transport`] seam plus an in-memory implementation
//! - Logging configuration
//!
//! ```ignore
//! use mucbot_runtime::{Bot, ConfigLoader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     let mut bot = Bot::from_config(&config)?;
//!
//!     // Register handlers, then run until Ctrl+C or a handle closes the bot
//!     bot.run(my_transport).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `toml-config`: read `mucbot.toml`
//! - `yaml-config`: read `mucbot.yaml` / `mucbot.yml`
//! - `json-log`: [`LogFormat::Json`] output

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod transport;

// Re-exports
pub use bot::{Bot, BotHandle};
pub use config::{
    BotConfig, Config, ConfigError, ConfigLoader, ConfigResult, LogLevel, validate_config,
};
pub use error::{RuntimeError, RuntimeResult, TransportError, TransportResult};
pub use logging::{LogFormat, LogOutput, LoggingBuilder, LoggingError, SpanEvents};
pub use transport::{MemoryPeer, MemoryTransport, Transport, TransportEvent, memory};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
