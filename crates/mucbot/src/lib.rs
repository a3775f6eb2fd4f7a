//! # mucbot
//!
//! A pattern-routed bot framework for multi-user chat rooms.
//!
//! ## Overview
//!
//! A bot joins one room and reacts to what happens there. Each reaction is a
//! handler: a pattern, an optional list of senders it listens to, and an
//! async callback.
//!
//! ```text
//! ┌───────────┐     ┌─────────────────────┐     ┌──────────────────────────┐
//! │ Transport │────▶│ Bot run loop        │────▶│ message handlers         │──▶ BotHandle::post
//! │ (session) │◀────│ (roster, dispatch)  │────▶│ join / leave / subject   │──▶ BotHandle::reply
//! └───────────┘     └─────────────────────┘     └──────────────────────────┘
//! ```
//!
//! - **Transport**: the chat session; connects, yields events, sends text
//! - **Bot**: owns the handlers and runs the loop
//! - **Handlers**: `on("weather :city")`, `exact("!quit")`, `any()` and raw regexes
//! - **BotHandle**: posts replies and closes the bot from inside callbacks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mucbot::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().set("nick", "helper").load()?;
//!     let mut bot = Bot::from_config(&config)?;
//!     let handle = bot.handle();
//!
//!     bot.message(on("hello :name").handle(move |event: Arc<Event>, params: Params| {
//!         let handle = handle.clone();
//!         async move {
//!             let name = params.get("name").unwrap_or("stranger");
//!             handle.reply(&event, format!("hi {name}, says {}", event.sender()));
//!         }
//!     }))?;
//!
//!     bot.run(my_transport).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `mucbot.toml` (default)
//! - `yaml-config`: read `mucbot.yaml` / `mucbot.yml`
//! - `json-log`: JSON log lines

pub use mucbot_core as core;
pub use mucbot_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use mucbot::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Bot and its handle - main entry point
    pub use mucbot_runtime::{Bot, BotHandle};

    // Configuration
    pub use mucbot_runtime::{BotConfig, Config, ConfigLoader, LogLevel};

    // Handler building
    pub use mucbot_core::{Handler, HandlerBuilder, PatternSpec, any, exact, on};

    // Callback arguments
    pub use mucbot_core::{Event, EventKind, Params};

    // Sessions - for custom transports
    pub use mucbot_core::{Inbound, Outgoing};
    pub use mucbot_runtime::{Transport, TransportError, TransportEvent, TransportResult};

    // Logging macros
    pub use mucbot_runtime::prelude::*;
}
