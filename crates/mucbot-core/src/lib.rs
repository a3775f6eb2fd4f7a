//! # mucbot core
//!
//! The routing engine of the mucbot group-chat bot framework.
//!
//! Incoming chat occurrences are turned into [`Event`]s and offered to the
//! [`Handler`]s registered for their [`EventKind`]. A handler pairs a compiled
//! pattern with an optional sender allow-list and a callback:
//!
//! ```text
//! ┌───────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │ Transport │────▶│ HandlerRegistry  │────▶│ Handler (match) │──▶ callback
//! │ (Inbound) │     │ (per-kind lists) │────▶│ Handler (skip)  │
//! └───────────┘     └──────────────────┘     └─────────────────┘
//! ```
//!
//! ## Patterns
//!
//! - `""` or [`any()`] matches everything and passes the whole text
//! - `"weather :city"` is a template; `:city` captures one word
//! - a [`regex::Regex`] is used as-is and yields positional captures
//! - [`exact()`] requires the entire message to match
//!
//! ## Example
//!
//! ```rust,ignore
//! use mucbot_core::{Event, EventKind, HandlerRegistry, Params, on};
//! use std::sync::Arc;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(
//!     EventKind::Message,
//!     on("weather :city")
//!         .handle(|event: Arc<Event>, params: Params| async move {
//!             println!("{} wants the weather in {:?}", event.sender(), params.get("city"));
//!         })
//!         .build()?,
//! );
//!
//! registry
//!     .dispatch_one(EventKind::Message, Event::message("alice", "weather oslo"))
//!     .await;
//! ```

pub mod builders;
pub mod error;
pub mod event;
pub mod handler;
pub mod params;
pub mod pattern;
pub mod registry;
pub mod transport;

pub use builders::{any, exact, on};
pub use error::{BoxError, PatternError, PatternResult, UnknownEventKind};
pub use event::{Event, EventKind, JOIN_TEXT, LEAVE_TEXT};
pub use handler::{
    BoxFuture, BoxedCallback, Callback, CallbackResult, Handler, HandlerBuilder,
    IntoCallbackResult,
};
pub use params::{NamedParams, Params};
pub use pattern::{CaptureMode, CompiledPattern, Pattern, PatternSpec, TokenOverrides};
pub use registry::HandlerRegistry;
pub use transport::{Inbound, Outgoing};

// Re-export regex so users build raw patterns against the same version.
pub use regex;
