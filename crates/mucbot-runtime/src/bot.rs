//! The bot: handler registration and the run loop.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use mucbot::prelude::*;
//!
//! let config = ConfigLoader::new().load()?;
//! let mut bot = Bot::from_config(&config)?;
//! let handle = bot.handle();
//!
//! bot.message(on("!ping").handle({
//!     let handle = handle.clone();
//!     move |event: Arc<Event>, _: Params| {
//!         let handle = handle.clone();
//!         async move { handle.reply(&event, "pong") }
//!     }
//! }))?;
//!
//! bot.run(my_transport).await?;
//! ```
//!
//! # Run loop
//!
//! After connecting, the loop waits on four things at once and handles
//! whichever is ready first:
//!
//! 1. a close request from a [`BotHandle`]
//! 2. the shutdown future (Ctrl+C / SIGTERM for [`Bot::run`])
//! 3. queued outgoing text
//! 4. the next transport event
//!
//! Events are dispatched one at a time, so a close request or shutdown
//! signal takes effect once the current event's handlers have finished.

use std::future::Future;
use std::sync::Arc;

use mucbot_core::{
    Event, EventKind, Handler, HandlerBuilder, HandlerRegistry, Inbound, JOIN_TEXT, LEAVE_TEXT,
    Outgoing, PatternResult, PatternSpec,
};
use parking_lot::RwLock;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::{BotConfig, Config, ConfigResult, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::transport::{Transport, TransportEvent};

// =============================================================================
// BotHandle
// =============================================================================

/// A cheap, cloneable handle for talking back to the room.
///
/// Callbacks capture a handle to post replies or stop the bot. Sending is
/// fire-and-forget: text is queued and delivered by the run loop.
#[derive(Clone)]
pub struct BotHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    nick: String,
    outgoing: mpsc::UnboundedSender<Outgoing>,
    shutdown: CancellationToken,
    users: RwLock<Vec<String>>,
}

impl BotHandle {
    fn new(nick: String, outgoing: mpsc::UnboundedSender<Outgoing>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                nick,
                outgoing,
                shutdown: CancellationToken::new(),
                users: RwLock::new(Vec::new()),
            }),
        }
    }

    /// The bot's nick in the room.
    pub fn nick(&self) -> &str {
        &self.inner.nick
    }

    /// Queues a message.
    pub fn send(&self, message: Outgoing) {
        if self.inner.outgoing.send(message).is_err() {
            debug!("Bot stopped, dropping outgoing message");
        }
    }

    /// Posts `text` to the room.
    pub fn post(&self, text: impl Into<String>) {
        self.send(Outgoing::room(text));
    }

    /// Sends `text` privately to `user`.
    pub fn post_to(&self, text: impl Into<String>, user: impl Into<String>) {
        self.send(Outgoing::private(text, user));
    }

    /// Answers `event` where it came from.
    ///
    /// Private messages are answered privately, everything else in the room.
    pub fn reply(&self, event: &Event, text: impl Into<String>) {
        if event.kind().is_private() {
            self.post_to(text, event.sender());
        } else {
            self.post(text);
        }
    }

    /// Asks the run loop to stop.
    pub fn close(&self) {
        self.inner.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Nicks currently in the room, in order of arrival.
    pub fn users(&self) -> Vec<String> {
        self.inner.users.read().clone()
    }

    fn add_user(&self, nick: &str) {
        let mut users = self.inner.users.write();
        if !users.iter().any(|u| u == nick) {
            users.push(nick.to_string());
        }
    }

    fn remove_user(&self, nick: &str) {
        self.inner.users.write().retain(|u| u != nick);
    }

    fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }
}

impl std::fmt::Debug for BotHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotHandle")
            .field("nick", &self.inner.nick)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// =============================================================================
// Bot
// =============================================================================

/// A group-chat bot: configuration, handlers and the outgoing queue.
///
/// Handlers are registered on `&mut Bot`; [`run`](Self::run) consumes the
/// bot, so nothing can be registered once it is serving.
pub struct Bot {
    config: BotConfig,
    registry: HandlerRegistry,
    handle: BotHandle,
    outgoing: mpsc::UnboundedReceiver<Outgoing>,
}

impl Bot {
    /// Creates a bot from a resolved configuration.
    pub fn new(config: BotConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = BotHandle::new(config.nick.clone(), tx);

        Self {
            config,
            registry: HandlerRegistry::new(),
            handle,
            outgoing: rx,
        }
    }

    /// Creates a bot from a configuration chain and initializes logging
    /// from it.
    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        let config = config.bot_config()?;
        logging::init_from_config(&config)?;

        info!(
            log_level = %config.log_level,
            nick = %config.nick,
            "Bot created from configuration"
        );
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Returns a handle for posting and closing from callbacks.
    pub fn handle(&self) -> BotHandle {
        self.handle.clone()
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a built handler for `kind`.
    pub fn register(&mut self, kind: EventKind, handler: Handler) -> &Handler {
        self.registry.register(kind, handler)
    }

    /// Builds and registers a handler for `kind`.
    pub fn on(&mut self, kind: EventKind, builder: HandlerBuilder) -> PatternResult<&Handler> {
        let handler = builder.build()?;
        Ok(self.registry.register(kind, handler))
    }

    /// Registers a handler for room messages.
    pub fn message(&mut self, builder: HandlerBuilder) -> PatternResult<&Handler> {
        self.on(EventKind::Message, builder)
    }

    /// Registers a handler for private messages.
    pub fn query(&mut self, builder: HandlerBuilder) -> PatternResult<&Handler> {
        self.on(EventKind::PrivateMessage, builder)
    }

    /// Alias for [`query`](Self::query).
    pub fn private_message(&mut self, builder: HandlerBuilder) -> PatternResult<&Handler> {
        self.query(builder)
    }

    /// Registers one handler for both room and private messages.
    pub fn message_and_query(&mut self, builder: HandlerBuilder) -> PatternResult<()> {
        let handler = builder.build()?;
        self.registry.register(EventKind::Message, handler.clone());
        self.registry.register(EventKind::PrivateMessage, handler);
        Ok(())
    }

    /// Registers a handler for arrivals.
    ///
    /// The pattern is always the exact text `join`; sender filter and
    /// callback come from `builder`.
    pub fn join(&mut self, builder: HandlerBuilder) -> PatternResult<&Handler> {
        self.on(EventKind::Join, builder.pattern(PatternSpec::exact(JOIN_TEXT)))
    }

    /// Registers a handler for departures, matching the exact text `leave`.
    pub fn leave(&mut self, builder: HandlerBuilder) -> PatternResult<&Handler> {
        self.on(EventKind::Leave, builder.pattern(PatternSpec::exact(LEAVE_TEXT)))
    }

    /// Registers a handler for subject changes.
    pub fn subject(&mut self, builder: HandlerBuilder) -> PatternResult<&Handler> {
        self.on(EventKind::Subject, builder)
    }

    /// Alias for [`subject`](Self::subject).
    pub fn topic(&mut self, builder: HandlerBuilder) -> PatternResult<&Handler> {
        self.subject(builder)
    }

    /// Dispatches a batch of events of one kind, in order.
    ///
    /// Returns the number of events processed, matched or not.
    pub async fn dispatch_events<I>(&self, kind: EventKind, events: I) -> usize
    where
        I: IntoIterator<Item = Event>,
    {
        self.registry.dispatch_all(kind, events).await
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Runs the bot until Ctrl+C, SIGTERM, a close request or the end of
    /// the session.
    pub async fn run<T: Transport>(self, transport: T) -> RuntimeResult<()> {
        info!("Bot is running. Press Ctrl+C to stop.");
        self.run_until(transport, wait_for_shutdown()).await
    }

    /// Runs the bot until `shutdown` completes, a close request or the end
    /// of the session.
    pub async fn run_until<T, F>(self, mut transport: T, shutdown: F) -> RuntimeResult<()>
    where
        T: Transport,
        F: Future<Output = ()>,
    {
        validate_config(&self.config)?;

        let Bot {
            config,
            registry,
            handle,
            mut outgoing,
        } = self;

        let room = config.room().unwrap_or_default();
        info!(
            login = config.login.as_deref().unwrap_or_default(),
            room = %room,
            nick = %config.nick,
            handlers = registry.len(),
            "Connecting"
        );
        transport.connect(&config).await?;
        handle.add_user(&config.nick);

        let token = handle.shutdown_token();
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => {
                    info!("Close requested");
                    break Ok(());
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break Ok(());
                }
                Some(message) = outgoing.recv() => {
                    if let Err(e) = transport.send(message).await {
                        warn!(error = %e, "Failed to send message");
                    }
                }
                event = transport.recv() => match event {
                    None => {
                        info!("Session ended by transport");
                        break Ok(());
                    }
                    Some(TransportEvent::Fatal(reason)) => {
                        error!(reason = %reason, "Fatal session error");
                        break Err(RuntimeError::Fatal(reason));
                    }
                    Some(TransportEvent::Inbound(inbound)) => {
                        handle_inbound(&registry, &handle, inbound).await;
                    }
                },
            }
        };

        // Deliver what callbacks queued before the loop ended.
        while let Ok(message) = outgoing.try_recv() {
            if let Err(e) = transport.send(message).await {
                warn!(error = %e, "Failed to send message during shutdown");
                break;
            }
        }

        token.cancel();
        if let Err(e) = transport.close().await {
            warn!(error = %e, "Error while closing transport");
        }
        info!("Bot stopped");

        result
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("nick", &self.config.nick)
            .field("registry", &self.registry)
            .finish()
    }
}

/// Updates the roster and dispatches one inbound record.
///
/// The roster follows joins and leaves even for replayed history; only live
/// events are dispatched, and the bot's own messages and join are skipped.
async fn handle_inbound(registry: &HandlerRegistry, handle: &BotHandle, inbound: Inbound) {
    let kind = inbound.kind;
    let own = inbound.sender == handle.nick();

    match kind {
        EventKind::Join => handle.add_user(&inbound.sender),
        EventKind::Leave => handle.remove_user(&inbound.sender),
        _ => {}
    }

    if inbound.history {
        trace!(kind = %kind, sender = %inbound.sender, "Skipping history");
        return;
    }

    if own && matches!(kind, EventKind::Message | EventKind::PrivateMessage | EventKind::Join) {
        trace!(kind = %kind, "Skipping own event");
        return;
    }

    registry.dispatch_one(kind, inbound.into_event()).await;
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                wait_for_ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = wait_for_ctrl_c() => {}
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            // Without a listener there is nothing to wait for; keep running.
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::transport::{MemoryTransport, memory};
    use mucbot_core::{Params, any, exact, on};
    use std::sync::Mutex;
    use std::time::Duration;

    fn config() -> BotConfig {
        BotConfig {
            login: Some("bot@example.org".into()),
            channel: Some("lounge".into()),
            server: Some("conference.example.org".into()),
            nick: "helper".into(),
            ..Default::default()
        }
    }

    type Seen = Arc<Mutex<Vec<String>>>;

    /// Adds a callback recording `"sender: text"` to `builder`.
    fn recorder(builder: HandlerBuilder, seen: &Seen) -> HandlerBuilder {
        let seen = Arc::clone(seen);
        builder.handle(move |event: Arc<Event>, _: Params| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(event.to_string());
            }
        })
    }

    /// Runs `bot` alongside `script`, closing the bot when the script ends.
    async fn drive(
        bot: Bot,
        transport: MemoryTransport,
        script: impl Future<Output = ()>,
    ) -> RuntimeResult<()> {
        let handle = bot.handle();
        let (result, ()) = tokio::join!(
            bot.run_until(transport, std::future::pending()),
            async move {
                script.await;
                handle.close();
            }
        );
        result
    }

    /// Lets the run loop catch up with everything delivered so far.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_reply_to_message() {
        let (transport, mut peer) = memory();
        let mut bot = Bot::new(config());
        let handle = bot.handle();

        bot.message(on("!ping").handle(move |event: Arc<Event>, _: Params| {
            let handle = handle.clone();
            async move { handle.reply(&event, "pong") }
        }))
        .unwrap();

        drive(bot, transport, async {
            peer.message("alice", "!ping please");
            assert_eq!(peer.next_outgoing().await, Some(Outgoing::room("pong")));
        })
        .await
        .unwrap();

        assert!(peer.is_closed());
    }

    #[tokio::test]
    async fn test_private_reply_goes_to_sender() {
        let (transport, mut peer) = memory();
        let mut bot = Bot::new(config());
        let handle = bot.handle();

        bot.query(any().handle(move |event: Arc<Event>, params: Params| {
            let handle = handle.clone();
            async move {
                let text = params.text().unwrap_or_default().to_uppercase();
                handle.reply(&event, text);
            }
        }))
        .unwrap();

        drive(bot, transport, async {
            peer.private_message("alice", "psst");
            assert_eq!(
                peer.next_outgoing().await,
                Some(Outgoing::private("PSST", "alice"))
            );
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_own_messages_and_history_are_ignored() {
        let (transport, peer) = memory();
        let seen: Seen = Arc::default();
        let mut bot = Bot::new(config());

        bot.message(recorder(any(), &seen)).unwrap();
        bot.join(recorder(any(), &seen)).unwrap();
        bot.leave(recorder(any(), &seen)).unwrap();

        drive(bot, transport, async {
            peer.message("helper", "talking to myself");
            peer.join("helper");
            peer.deliver(Inbound::new(EventKind::Message, "alice", "old news").history());
            peer.message("alice", "fresh");
            peer.leave("helper");
            settle().await;
        })
        .await
        .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["alice: fresh".to_string(), "helper: leave".to_string()]
        );
    }

    #[tokio::test]
    async fn test_roster_tracking() {
        let (transport, peer) = memory();
        let bot = Bot::new(config());
        let handle = bot.handle();

        drive(bot, transport, async {
            peer.join("alice");
            peer.deliver(Inbound::new(EventKind::Join, "bob", "").history());
            peer.join("alice");
            settle().await;
            assert_eq!(handle.users(), ["helper", "alice", "bob"]);

            peer.leave("alice");
            settle().await;
            assert_eq!(handle.users(), ["helper", "bob"]);
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_join_handlers_use_fixed_pattern() {
        let (transport, peer) = memory();
        let seen: Seen = Arc::default();
        let mut bot = Bot::new(config());

        bot.join(recorder(on("something else entirely"), &seen).from(["alice"]))
            .unwrap();

        drive(bot, transport, async {
            peer.join("alice");
            peer.join("bob");
            settle().await;
        })
        .await
        .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["alice: join".to_string()]);
    }

    #[tokio::test]
    async fn test_message_and_query() {
        let (transport, peer) = memory();
        let seen: Seen = Arc::default();
        let mut bot = Bot::new(config());

        bot.message_and_query(recorder(exact("!help"), &seen)).unwrap();
        assert_eq!(bot.registry().handlers(EventKind::Message).len(), 1);
        assert_eq!(bot.registry().handlers(EventKind::PrivateMessage).len(), 1);

        drive(bot, transport, async {
            peer.message("alice", "!help");
            peer.private_message("bob", "!help");
            peer.subject("carol", "!help");
            settle().await;
        })
        .await
        .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["alice: !help".to_string(), "bob: !help".to_string()]
        );
    }

    #[tokio::test]
    async fn test_close_from_callback_flushes_queue() {
        let (transport, mut peer) = memory();
        let mut bot = Bot::new(config());
        let handle = bot.handle();

        bot.message(exact("!quit").from(["admin"]).handle(
            move |_: Arc<Event>, _: Params| {
                let handle = handle.clone();
                async move {
                    handle.post("bye");
                    handle.close();
                }
            },
        ))
        .unwrap();

        peer.message("mallory", "!quit");
        peer.message("admin", "!quit");

        bot.run_until(transport, std::future::pending()).await.unwrap();

        assert_eq!(peer.drain(), vec![Outgoing::room("bye")]);
        assert!(peer.is_closed());
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_bot() {
        let (transport, mut peer) = memory();
        let mut bot = Bot::new(config());
        let handle = bot.handle();

        bot.message(any().handle(|_: Arc<Event>, _: Params| async {
            Err::<(), _>("handler failed")
        }))
        .unwrap();
        bot.message(any().handle(move |event: Arc<Event>, _: Params| {
            let handle = handle.clone();
            async move { handle.reply(&event, "still here") }
        }))
        .unwrap();

        drive(bot, transport, async {
            peer.message("alice", "one");
            assert_eq!(
                peer.next_outgoing().await,
                Some(Outgoing::room("still here"))
            );
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_fatal_error_ends_run() {
        let (transport, peer) = memory();
        let bot = Bot::new(config());

        peer.fail("stream reset");
        let result = bot.run_until(transport, std::future::pending()).await;

        assert!(matches!(result, Err(RuntimeError::Fatal(reason)) if reason == "stream reset"));
        assert!(peer.is_closed());
    }

    #[tokio::test]
    async fn test_session_end_stops_bot() {
        let (transport, peer) = memory();
        drop(peer);

        let result = Bot::new(config())
            .run_until(transport, std::future::pending())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_future_stops_bot() {
        let (transport, peer) = memory();
        let result = Bot::new(config()).run_until(transport, async {}).await;

        assert!(result.is_ok());
        assert!(peer.is_connected());
        assert!(peer.is_closed());
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_connect() {
        let (transport, peer) = memory();
        let result = Bot::new(BotConfig::default())
            .run_until(transport, std::future::pending())
            .await;

        assert!(matches!(result, Err(RuntimeError::Config(_))));
        assert!(!peer.is_connected());
    }

    #[tokio::test]
    async fn test_dispatch_events_counts_batch() {
        let seen: Seen = Arc::default();
        let mut bot = Bot::new(config());
        bot.subject(recorder(on("release :version"), &seen)).unwrap();

        let processed = bot
            .dispatch_events(
                EventKind::Subject,
                vec![
                    Event::subject("alice", "release 1.2"),
                    Event::subject("alice", "lunch"),
                ],
            )
            .await;

        assert_eq!(processed, 2);
        assert_eq!(*seen.lock().unwrap(), vec!["alice: release 1.2".to_string()]);
    }

    #[test]
    fn test_from_config_reports_unusable_log_file() {
        let config = Config::from(&BotConfig {
            log_file: Some("/proc/no-such-dir/bot.log".into()),
            ..config()
        });
        assert!(matches!(
            Bot::from_config(&config),
            Err(ConfigError::LogFile { .. })
        ));
    }

    #[test]
    fn test_invalid_pattern_fails_registration() {
        let mut bot = Bot::new(config());
        assert!(bot.message(on("broken (")).is_err());
        assert!(bot.registry().is_empty());
    }

    #[test]
    fn test_run_future_is_send() {
        fn is_send<T: Send>(_: T) {}

        let (transport, _peer) = memory();
        is_send(Bot::new(config()).run_until(transport, std::future::pending::<()>()));
    }
}
