//! The chat session seen from the bot.
//!
//! A [`Transport`] owns the connection to the chat service. The run loop
//! pulls [`TransportEvent`]s from it one at a time and pushes [`Outgoing`]
//! text into it. Reconnection, presence and protocol framing stay inside the
//! implementation.
//!
//! [`MemoryTransport`] is an in-process implementation driven by a
//! [`MemoryPeer`], for tests and for embedding the bot behind another
//! event source.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use mucbot_core::{EventKind, Inbound, Outgoing};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::config::BotConfig;
use crate::error::{TransportError, TransportResult};

/// Something the transport reports to the run loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A chat occurrence.
    Inbound(Inbound),
    /// The session failed and cannot continue.
    Fatal(String),
}

impl From<Inbound> for TransportEvent {
    fn from(inbound: Inbound) -> Self {
        Self::Inbound(inbound)
    }
}

/// A connection to a group chat.
///
/// `recv` must be cancel-safe: the run loop drops a pending `recv` future
/// whenever outgoing text or a shutdown request arrives first.
#[async_trait]
pub trait Transport: Send {
    /// Opens the session and joins the configured room.
    async fn connect(&mut self, config: &BotConfig) -> TransportResult<()>;

    /// Waits for the next event; `None` means the session ended.
    async fn recv(&mut self) -> Option<TransportEvent>;

    /// Sends text to the room, or privately when [`Outgoing::to`] is set.
    async fn send(&mut self, message: Outgoing) -> TransportResult<()>;

    /// Leaves the room and closes the session.
    async fn close(&mut self) -> TransportResult<()>;
}

// ============================================================================
// Memory Transport
// ============================================================================

/// Creates a connected transport/peer pair.
pub fn memory() -> (MemoryTransport, MemoryPeer) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
    let state = Arc::new(MemoryState::default());

    let transport = MemoryTransport {
        inbound: inbound_rx,
        outgoing: outgoing_tx,
        state: Arc::clone(&state),
    };
    let peer = MemoryPeer {
        inbound: inbound_tx,
        outgoing: outgoing_rx,
        state,
    };
    (transport, peer)
}

#[derive(Debug, Default)]
struct MemoryState {
    connected: AtomicBool,
    closed: AtomicBool,
}

/// The bot side of an in-process session.
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    outgoing: mpsc::UnboundedSender<Outgoing>,
    state: Arc<MemoryState>,
}

impl MemoryTransport {
    /// Creates a connected transport/peer pair.
    pub fn pair() -> (Self, MemoryPeer) {
        memory()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&mut self, config: &BotConfig) -> TransportResult<()> {
        if self.state.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        debug!(nick = %config.nick, room = ?config.room(), "Memory session opened");
        self.state.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        if self.state.closed.load(Ordering::Acquire) {
            return None;
        }
        self.inbound.recv().await
    }

    async fn send(&mut self, message: Outgoing) -> TransportResult<()> {
        trace!(to = ?message.to, text = %message.text, "Memory send");
        self.outgoing
            .send(message)
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.state.closed.store(true, Ordering::Release);
        self.inbound.close();
        Ok(())
    }
}

/// The chat-service side of an in-process session.
#[derive(Debug)]
pub struct MemoryPeer {
    inbound: mpsc::UnboundedSender<TransportEvent>,
    outgoing: mpsc::UnboundedReceiver<Outgoing>,
    state: Arc<MemoryState>,
}

impl MemoryPeer {
    /// Delivers an event to the bot; returns `false` once the bot is gone.
    pub fn deliver(&self, event: impl Into<TransportEvent>) -> bool {
        self.inbound.send(event.into()).is_ok()
    }

    /// Delivers a room message.
    pub fn message(&self, sender: &str, text: &str) -> bool {
        self.deliver(Inbound::new(EventKind::Message, sender, text))
    }

    /// Delivers a private message.
    pub fn private_message(&self, sender: &str, text: &str) -> bool {
        self.deliver(Inbound::new(EventKind::PrivateMessage, sender, text))
    }

    pub fn join(&self, sender: &str) -> bool {
        self.deliver(Inbound::new(EventKind::Join, sender, ""))
    }

    pub fn leave(&self, sender: &str) -> bool {
        self.deliver(Inbound::new(EventKind::Leave, sender, ""))
    }

    /// Delivers a subject change.
    pub fn subject(&self, sender: &str, subject: &str) -> bool {
        self.deliver(Inbound::new(EventKind::Subject, sender, subject))
    }

    /// Reports a fatal session error.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.deliver(TransportEvent::Fatal(reason.into()))
    }

    /// Waits for the next message the bot sent.
    pub async fn next_outgoing(&mut self) -> Option<Outgoing> {
        self.outgoing.recv().await
    }

    /// Returns every message sent so far without waiting.
    pub fn drain(&mut self) -> Vec<Outgoing> {
        let mut sent = Vec::new();
        while let Ok(message) = self.outgoing.try_recv() {
            sent.push(message);
        }
        sent
    }

    /// Whether the bot connected.
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    /// Whether the bot closed the session.
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_round_trip() {
        let (mut transport, mut peer) = memory();
        transport.connect(&BotConfig::default()).await.unwrap();
        assert!(peer.is_connected());

        assert!(peer.message("alice", "hello"));
        let event = transport.recv().await.unwrap();
        assert_eq!(
            event,
            TransportEvent::Inbound(Inbound::new(EventKind::Message, "alice", "hello"))
        );

        transport.send(Outgoing::private("hi", "alice")).await.unwrap();
        assert_eq!(peer.next_outgoing().await, Some(Outgoing::private("hi", "alice")));
    }

    #[tokio::test]
    async fn test_close_ends_session() {
        let (mut transport, peer) = memory();
        transport.close().await.unwrap();

        assert!(peer.is_closed());
        assert!(!peer.message("alice", "anyone?"));
        assert_eq!(transport.recv().await, None);
        assert!(transport.connect(&BotConfig::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_peer_drop_ends_session() {
        let (mut transport, peer) = memory();
        drop(peer);

        assert_eq!(transport.recv().await, None);
        assert!(matches!(
            transport.send(Outgoing::room("hello?")).await,
            Err(TransportError::Closed)
        ));
    }
}
