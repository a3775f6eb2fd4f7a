//! Handlers: a compiled pattern, a sender allow-list and a callback.
//!
//! A [`Handler`] answers two questions about an incoming [`Event`]:
//!
//! 1. does it qualify? ([`Handler::recognize`])
//! 2. which parameters does it carry? ([`Handler::params`])
//!
//! and, when both succeed, runs its callback ([`Handler::dispatch`]).
//!
//! # Callbacks
//!
//! Any async closure taking the event and its parameters is a callback. It may
//! return `()` or a `Result<(), E>` for any error convertible into
//! [`BoxError`]:
//!
//! ```rust,ignore
//! use mucbot_core::{on, Event, Params};
//! use std::sync::Arc;
//!
//! let handler = on("!tw :id")
//!     .from(["alice", "bob"])
//!     .handle(|event: Arc<Event>, params: Params| async move {
//!         println!("{} asked for {:?}", event.sender(), params.get("id"));
//!     })
//!     .build()?;
//! ```

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::trace;

use crate::error::{BoxError, PatternResult};
use crate::event::Event;
use crate::params::Params;
use crate::pattern::{CompiledPattern, PatternSpec, TokenOverrides};

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a callback produced.
pub type CallbackResult = Result<(), BoxError>;

// ============================================================================
// Callback Trait
// ============================================================================

/// Conversion of a callback's output into a [`CallbackResult`].
pub trait IntoCallbackResult {
    fn into_callback_result(self) -> CallbackResult;
}

impl IntoCallbackResult for () {
    fn into_callback_result(self) -> CallbackResult {
        Ok(())
    }
}

impl<E> IntoCallbackResult for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_callback_result(self) -> CallbackResult {
        self.map_err(Into::into)
    }
}

/// The function bound to a handler.
///
/// Implemented for every `Fn(Arc<Event>, Params) -> impl Future` whose output
/// implements [`IntoCallbackResult`].
pub trait Callback: Send + Sync + 'static {
    /// Invokes the callback.
    fn call(&self, event: Arc<Event>, params: Params) -> BoxFuture<'static, CallbackResult>;
}

impl<F, Fut> Callback for F
where
    F: Fn(Arc<Event>, Params) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoCallbackResult,
{
    fn call(&self, event: Arc<Event>, params: Params) -> BoxFuture<'static, CallbackResult> {
        let fut = (self)(event, params);
        Box::pin(async move { fut.await.into_callback_result() })
    }
}

/// A type-erased callback that can be stored in collections.
pub type BoxedCallback = Arc<dyn Callback>;

// ============================================================================
// Handler
// ============================================================================

/// A compiled matcher, an optional sender allow-list and an optional callback.
///
/// Handlers are built once at registration time and never change afterwards.
/// Cloning is cheap apart from the allow-list.
#[derive(Clone)]
pub struct Handler {
    name: Option<String>,
    /// `None` matches every event.
    pattern: Option<CompiledPattern>,
    /// `None` accepts every sender.
    allowed_senders: Option<HashSet<String>>,
    callback: Option<BoxedCallback>,
}

impl Handler {
    /// Creates a handler builder matching everything.
    pub fn builder() -> HandlerBuilder {
        HandlerBuilder::new()
    }

    /// Creates a handler for `pattern` with no allow-list and no callback.
    pub fn new(pattern: impl Into<PatternSpec>) -> PatternResult<Self> {
        HandlerBuilder::new().pattern(pattern).build()
    }

    /// Returns the handler name used in logs, if set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn pattern(&self) -> Option<&CompiledPattern> {
        self.pattern.as_ref()
    }

    pub fn allowed_senders(&self) -> Option<&HashSet<String>> {
        self.allowed_senders.as_ref()
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Checks whether this handler accepts `event`.
    ///
    /// The text must match the pattern (if any) and the sender must be in
    /// the allow-list (if any). Sender comparison is exact and
    /// case-sensitive.
    pub fn recognize(&self, event: &Event) -> bool {
        if let Some(pattern) = &self.pattern
            && !pattern.is_match(event.text())
        {
            trace!(handler = self.label(), "Pattern did not match");
            return false;
        }

        if let Some(senders) = &self.allowed_senders
            && !senders.contains(event.sender())
        {
            trace!(
                handler = self.label(),
                sender = event.sender(),
                "Sender not allowed"
            );
            return false;
        }

        true
    }

    /// Builds the parameter set for `event`, or `None` if it is not
    /// recognized.
    pub fn params(&self, event: &Event) -> Option<Params> {
        if !self.recognize(event) {
            return None;
        }

        match &self.pattern {
            Some(pattern) => pattern.extract(event.text()),
            None => Some(Params::Text(event.text().to_string())),
        }
    }

    /// Runs the callback if `event` is recognized.
    ///
    /// Returns `None` when the event is not recognized or no callback is
    /// bound, otherwise whatever the callback returned.
    pub async fn dispatch(&self, event: Arc<Event>) -> Option<CallbackResult> {
        let params = self.params(&event)?;
        let callback = self.callback.as_ref()?;
        Some(callback.call(event, params).await)
    }

    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_ref().map(|p| p.regex().as_str()))
            .field("allowed_senders", &self.allowed_senders)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

// ============================================================================
// Handler Builder
// ============================================================================

/// Builder for [`Handler`].
///
/// The pattern is compiled in [`build`](Self::build), so an invalid pattern
/// is reported when the handler is registered.
#[derive(Default)]
pub struct HandlerBuilder {
    name: Option<String>,
    pattern: PatternSpec,
    overrides: TokenOverrides,
    allowed_senders: Option<HashSet<String>>,
    callback: Option<BoxedCallback>,
}

impl HandlerBuilder {
    /// Creates a builder matching every event from every sender.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a name for this handler (useful for debugging).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the pattern.
    pub fn pattern(mut self, pattern: impl Into<PatternSpec>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Sets whether the pattern must match the whole message.
    pub fn exact(mut self, exact: bool) -> Self {
        self.pattern = self.pattern.with_exact(exact);
        self
    }

    /// Overrides the expression captured by the template token `name`.
    pub fn token(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), expression.into());
        self
    }

    /// Restricts the handler to the given senders.
    ///
    /// Entries are converted to strings once, here.
    pub fn from<I, S>(mut self, senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.allowed_senders = Some(senders.into_iter().map(|s| s.to_string()).collect());
        self
    }

    /// Binds the callback.
    pub fn handle<F>(mut self, callback: F) -> Self
    where
        F: Callback,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Binds a pre-built boxed callback.
    pub fn handle_boxed(mut self, callback: BoxedCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Compiles the pattern and builds the handler.
    pub fn build(self) -> PatternResult<Handler> {
        let pattern = self.pattern.compile(&self.overrides)?;

        Ok(Handler {
            name: self.name,
            pattern,
            allowed_senders: self.allowed_senders,
            callback: self.callback,
        })
    }
}
