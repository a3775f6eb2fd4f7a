//! Values exchanged with the chat transport.
//!
//! The transport itself lives outside the core. It hands the core [`Inbound`]
//! records and receives [`Outgoing`] text; delivery is fire-and-forget.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::event::{Event, EventKind, JOIN_TEXT, LEAVE_TEXT};

/// Something received from the chat session, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub kind: EventKind,
    pub sender: String,
    pub text: String,
    /// Time reported by the server; `None` means "now".
    pub timestamp: Option<OffsetDateTime>,
    /// Set for messages replayed from the room history on join.
    pub history: bool,
}

impl Inbound {
    pub fn new(kind: EventKind, sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            sender: sender.into(),
            text: text.into(),
            timestamp: None,
            history: false,
        }
    }

    /// Marks this record as replayed room history.
    pub fn history(mut self) -> Self {
        self.history = true;
        self
    }

    pub fn at(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Normalizes the record into an [`Event`].
    ///
    /// Join and leave records get their fixed text regardless of what the
    /// transport supplied.
    pub fn into_event(self) -> Event {
        let text = match self.kind {
            EventKind::Join => JOIN_TEXT.to_string(),
            EventKind::Leave => LEAVE_TEXT.to_string(),
            _ => self.text,
        };
        let timestamp = self.timestamp.unwrap_or_else(OffsetDateTime::now_utc);
        Event::with_timestamp(self.kind, self.sender, text, timestamp)
    }
}

/// Text the bot wants to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outgoing {
    pub text: String,
    /// Recipient nick for a private message; `None` posts to the room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl Outgoing {
    /// A message for the whole room.
    pub fn room(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            to: None,
        }
    }

    /// A private message for `user`.
    pub fn private(text: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            to: Some(user.into()),
        }
    }

    pub fn is_private(&self) -> bool {
        self.to.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_into_event_keeps_fields() {
        let at = datetime!(2024-05-01 12:00 UTC);
        let event = Inbound::new(EventKind::Message, "alice", "hello")
            .at(at)
            .into_event();

        assert_eq!(event.kind(), EventKind::Message);
        assert_eq!(event.sender(), "alice");
        assert_eq!(event.text(), "hello");
        assert_eq!(event.timestamp(), at);
    }

    #[test]
    fn test_presence_text_is_fixed() {
        let event = Inbound::new(EventKind::Join, "alice", "available").into_event();
        assert_eq!(event.text(), "join");

        let event = Inbound::new(EventKind::Leave, "alice", "").into_event();
        assert_eq!(event.text(), "leave");
    }

    #[test]
    fn test_outgoing_targets() {
        assert!(!Outgoing::room("hi").is_private());

        let private = Outgoing::private("hi", "bob");
        assert_eq!(private.to.as_deref(), Some("bob"));
    }
}
