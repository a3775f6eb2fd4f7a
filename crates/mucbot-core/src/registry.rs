//! Handler registry and event dispatcher.
//!
//! The [`HandlerRegistry`] keeps one ordered handler list per [`EventKind`].
//! When an event is dispatched:
//!
//! 1. Handlers registered for the event's kind are tried in registration order
//! 2. Every handler that recognizes the event runs, there is no short-circuit
//! 3. A failing or panicking callback is logged and the next handler still runs
//!
//! ```rust,ignore
//! use mucbot_core::{EventKind, HandlerRegistry, on};
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(EventKind::Message, on("!help").handle(help).build()?);
//! registry.register(EventKind::Message, any().handle(log).build()?);
//!
//! registry.dispatch_one(EventKind::Message, Event::message("alice", "!help")).await;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::error::Error;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{Instrument, Level, debug, error, span, trace};

use crate::event::{Event, EventKind};
use crate::handler::Handler;

/// Maximum number of error sources written to the log for a failed callback.
const MAX_ERROR_CHAIN: usize = 6;

/// Ordered handler lists keyed by event kind.
///
/// Lists are created on first registration, only ever grow, and keep
/// insertion order. Registration takes `&mut self`, so it has to be finished
/// before the registry is shared with a dispatch loop.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl HandlerRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Appends `handler` to the list for `kind` and returns it.
    pub fn register(&mut self, kind: EventKind, handler: Handler) -> &Handler {
        debug!(
            kind = %kind,
            handler = handler.label(),
            "Registering handler"
        );

        let list = self.handlers.entry(kind).or_default();
        let index = list.len();
        list.push(handler);
        &list[index]
    }

    /// Registers a handler (builder pattern).
    pub fn with(mut self, kind: EventKind, handler: Handler) -> Self {
        self.register(kind, handler);
        self
    }

    /// Returns the handlers registered for `kind`, in registration order.
    pub fn handlers(&self, kind: EventKind) -> &[Handler] {
        self.handlers.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the total number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispatches each event in order and returns how many were processed.
    pub async fn dispatch_all<I>(&self, kind: EventKind, events: I) -> usize
    where
        I: IntoIterator,
        I::Item: Into<Arc<Event>>,
    {
        let mut processed = 0;
        for event in events {
            self.dispatch_one(kind, event).await;
            processed += 1;
        }
        processed
    }

    /// Offers `event` to every handler registered for `kind`.
    ///
    /// Returns the number of callbacks that ran, failed ones included.
    /// Callback errors and panics never escape this method.
    pub async fn dispatch_one(&self, kind: EventKind, event: impl Into<Arc<Event>>) -> usize {
        let event = event.into();
        let span = span!(Level::DEBUG, "dispatch", kind = %kind, sender = event.sender());

        async move {
            let mut invoked = 0;

            for (index, handler) in self.handlers(kind).iter().enumerate() {
                let outcome = AssertUnwindSafe(handler.dispatch(Arc::clone(&event)))
                    .catch_unwind()
                    .await;

                match outcome {
                    Ok(None) => {}
                    Ok(Some(Ok(()))) => {
                        invoked += 1;
                        trace!(handler = handler.label(), index, "Handler completed");
                    }
                    Ok(Some(Err(err))) => {
                        invoked += 1;
                        error!(
                            kind = %kind,
                            handler = handler.label(),
                            index,
                            error = %err,
                            chain = %error_chain(err.as_ref()),
                            "Handler callback failed"
                        );
                    }
                    Err(payload) => {
                        invoked += 1;
                        error!(
                            kind = %kind,
                            handler = handler.label(),
                            index,
                            panic = panic_message(payload.as_ref()),
                            "Handler callback panicked"
                        );
                    }
                }
            }

            debug!(invoked, "Dispatch finished");
            invoked
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<_> = self
            .handlers
            .iter()
            .map(|(kind, list)| (kind.as_str(), list.len()))
            .collect();
        counts.sort_unstable();

        f.debug_struct("HandlerRegistry")
            .field("handlers", &counts)
            .finish()
    }
}

/// Renders an error and its sources, outermost first.
fn error_chain(err: &(dyn Error + Send + Sync + 'static)) -> String {
    let mut chain = Vec::new();
    let mut current: Option<&(dyn Error + 'static)> = Some(err);

    while let Some(e) = current {
        if chain.len() == MAX_ERROR_CHAIN {
            chain.push("...".to_string());
            break;
        }
        chain.push(e.to_string());
        current = e.source();
    }

    chain.join(" <- ")
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
