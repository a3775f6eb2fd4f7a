//! Chat events routed by the dispatcher.
//!
//! - [`EventKind`] - the closed set of chat occurrences handlers register for
//! - [`Event`] - an immutable record of one occurrence

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::UnknownEventKind;

// ============================================================================
// Event Kind
// ============================================================================

/// Category of a chat occurrence.
///
/// Handlers are registered per kind and the registry keeps one ordered list
/// for each of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A message posted to the room.
    Message,
    /// A private message addressed to the bot.
    PrivateMessage,
    /// Someone entered the room.
    Join,
    /// Someone left the room.
    Leave,
    /// The room subject (topic) changed.
    Subject,
}

impl EventKind {
    /// Every event kind, in a stable order.
    pub const ALL: [EventKind; 5] = [
        EventKind::Message,
        EventKind::PrivateMessage,
        EventKind::Join,
        EventKind::Leave,
        EventKind::Subject,
    ];

    /// Returns the canonical name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::PrivateMessage => "private",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Subject => "subject",
        }
    }

    /// Returns `true` for kinds whose replies go back to the sender only.
    pub fn is_private(&self) -> bool {
        matches!(self, Self::PrivateMessage)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "message" => Self::Message,
            "private" | "private_message" | "query" => Self::PrivateMessage,
            "join" => Self::Join,
            "leave" => Self::Leave,
            "subject" | "topic" => Self::Subject,
            _ => return Err(UnknownEventKind(s.to_string())),
        })
    }
}

// ============================================================================
// Event
// ============================================================================

/// Text carried by join events.
pub const JOIN_TEXT: &str = "join";

/// Text carried by leave events.
pub const LEAVE_TEXT: &str = "leave";

/// One chat occurrence as seen by handlers.
///
/// Events are created by the transport side when something is received and
/// are never mutated afterwards; handlers get them behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    kind: EventKind,
    sender: String,
    text: String,
    timestamp: OffsetDateTime,
}

impl Event {
    /// Creates an event stamped with the current time.
    pub fn new(kind: EventKind, sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_timestamp(kind, sender, text, OffsetDateTime::now_utc())
    }

    /// Creates an event with an explicit timestamp.
    pub fn with_timestamp(
        kind: EventKind,
        sender: impl Into<String>,
        text: impl Into<String>,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            kind,
            sender: sender.into(),
            text: text.into(),
            timestamp,
        }
    }

    /// A public room message.
    pub fn message(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(EventKind::Message, sender, text)
    }

    /// A private message.
    pub fn private_message(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(EventKind::PrivateMessage, sender, text)
    }

    /// A join notification; its text is always [`JOIN_TEXT`].
    pub fn join(sender: impl Into<String>) -> Self {
        Self::new(EventKind::Join, sender, JOIN_TEXT)
    }

    /// A leave notification; its text is always [`LEAVE_TEXT`].
    pub fn leave(sender: impl Into<String>) -> Self {
        Self::new(EventKind::Leave, sender, LEAVE_TEXT)
    }

    /// A subject change, where `text` is the new subject.
    pub fn subject(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(EventKind::Subject, sender, text)
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sender, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_name() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!("query".parse::<EventKind>().unwrap(), EventKind::PrivateMessage);
        assert_eq!("Topic".parse::<EventKind>().unwrap(), EventKind::Subject);
        assert!("presence".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_join_and_leave_text() {
        assert_eq!(Event::join("alice").text(), "join");
        assert_eq!(Event::leave("alice").text(), "leave");
    }

    #[test]
    fn test_display() {
        let event = Event::message("alice", "hello there");
        assert_eq!(event.to_string(), "alice: hello there");
    }
}
