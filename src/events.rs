//! Event notification interface
//!
//! The relay core reports lifecycle and message events through `EventSink`
//! so that a presentation layer (a GUI, a headless logger, a test recorder)
//! can render them without the core knowing anything about display. Calls
//! are made synchronously on whichever task detected the event; the sink
//! implementation owns any locking it needs to render safely.

use tracing::info;

/// Capability interface consumed by the relay core
pub trait EventSink: Send + Sync {
    /// A message passed through the router. `own` is true when the message
    /// was injected locally by the embedding layer (render as "self"),
    /// false when it arrived from a client session.
    fn on_message(&self, text: &str, own: bool);

    /// A session completed its handshake and joined the registry
    fn on_connect(&self, username: &str);

    /// A session left the registry
    fn on_disconnect(&self, username: &str);

    /// The set of connected usernames changed; `usernames` is in registry
    /// (insertion) order
    fn on_roster_changed(&self, usernames: &[String]);
}

/// Headless sink that logs events via tracing
///
/// The default sink for running the relay without a display attached.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn on_message(&self, text: &str, own: bool) {
        info!(own, "message: {}", text);
    }

    fn on_connect(&self, username: &str) {
        info!("[Connected] {}", username);
    }

    fn on_disconnect(&self, username: &str) {
        info!("[Disconnected] {}", username);
    }

    fn on_roster_changed(&self, usernames: &[String]) {
        info!("roster: {:?}", usernames);
    }
}
