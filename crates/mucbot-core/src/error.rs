//! Error types for the mucbot core.
//!
//! Only registration can fail loudly. Everything that goes wrong while an
//! event is being dispatched is contained by the
//! [`HandlerRegistry`](crate::registry::HandlerRegistry) and logged.

use thiserror::Error;

/// Boxed error returned by handler callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while turning a pattern specification into a matcher.
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    /// The rendered expression was rejected by the regex engine.
    #[error("failed to compile pattern '{pattern}': {source}")]
    Compile {
        /// The pattern as the caller supplied it.
        pattern: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },
}

impl PatternError {
    /// Creates a compile error for the given pattern source.
    pub fn compile(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::Compile {
            pattern: pattern.into(),
            source,
        }
    }

    /// Returns the offending pattern text.
    pub fn pattern(&self) -> &str {
        match self {
            Self::Compile { pattern, .. } => pattern,
        }
    }
}

/// Error returned when a string does not name an event kind.
#[derive(Debug, Clone, Error)]
#[error("unknown event kind: '{0}'")]
pub struct UnknownEventKind(pub String);

/// Result type for pattern compilation.
pub type PatternResult<T> = Result<T, PatternError>;
