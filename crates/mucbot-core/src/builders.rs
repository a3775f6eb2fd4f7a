//! Handler builder functions for common pattern shapes.
//!
//! # Example
//!
//! ```rust,ignore
//! use mucbot_core::{any, exact, on};
//!
//! let log = any().handle(log_handler);
//! let quit = exact("!quit").from(["admin"]).handle(quit_handler);
//! let weather = on("weather :city").handle(weather_handler);
//! ```

use crate::handler::HandlerBuilder;
use crate::pattern::PatternSpec;

/// Creates a handler builder for `pattern`.
///
/// Strings are templates (`"!tw :id"`), a `Regex` is used verbatim.
pub fn on(pattern: impl Into<PatternSpec>) -> HandlerBuilder {
    HandlerBuilder::new().pattern(pattern)
}

/// Creates a handler builder whose template must match the whole message.
pub fn exact(text: impl Into<String>) -> HandlerBuilder {
    HandlerBuilder::new().pattern(PatternSpec::exact(text))
}

/// Creates a handler builder that matches every event.
pub fn any() -> HandlerBuilder {
    HandlerBuilder::new()
}
