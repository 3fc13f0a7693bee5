//! Message and destination types
//!
//! A `Message` is a transient routing record: it exists only for the
//! duration of one `Router::route` call and is never persisted. The body is
//! already a finished display string (clients do their own `"name: text"`
//! framing); the relay neither parses nor rewrites it.

use chrono::{DateTime, Local};

use crate::types::SessionId;

/// Where a message should be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Every currently active session
    Broadcast,
    /// A single session matched by username (case-insensitive, first match)
    User(String),
}

/// One message in flight through the router
///
/// The timestamp is assigned here, at relay time, not taken from the client.
/// `origin` is the session the message arrived on, if any; broadcast
/// delivery skips it so the sender never receives a second on-the-wire copy
/// of its own line. Operator-injected messages have no origin.
#[derive(Debug, Clone)]
pub struct Message {
    /// Sender label (username, or the embedding layer's own label)
    pub sender: String,
    /// Display text, relayed verbatim
    pub body: String,
    /// Relay-time timestamp
    pub timestamp: DateTime<Local>,
    /// Delivery selector
    pub destination: Destination,
    /// Session the message came in on, if client-originated
    pub origin: Option<SessionId>,
}

impl Message {
    /// Create a broadcast message
    pub fn broadcast(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            timestamp: Local::now(),
            destination: Destination::Broadcast,
            origin: None,
        }
    }

    /// Create a message addressed to one username
    pub fn directed(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            timestamp: Local::now(),
            destination: Destination::User(recipient.into()),
            origin: None,
        }
    }

    /// Tag the message with the session it arrived on
    pub fn with_origin(mut self, origin: SessionId) -> Self {
        self.origin = Some(origin);
        self
    }

    /// True when the message was injected by the embedding layer rather
    /// than received from a client session
    pub fn from_operator(&self) -> bool {
        self.origin.is_none()
    }

    /// Wall-clock time of relay, formatted for display (e.g. "14:32")
    pub fn clock_time(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}
