//! Session lifecycle and the per-connection driver
//!
//! A `Session` is the relay's handle for one accepted connection: its
//! identity, the write half of the stream, and an atomic lifecycle state.
//! The read half stays with the connection task running `run_session`;
//! writes can come from the router on other tasks, so the write half sits
//! behind an async mutex (one in-flight write per session).
//!
//! Lifecycle: `Connecting → Active → Closed`, with `Connecting → Closed`
//! directly when the peer drops before sending its username line. The
//! transition into `Closed` is a compare-and-swap, so cleanup (deregister,
//! disconnect event, socket shutdown) runs exactly once no matter whether
//! the read loop, a failed router write, or an external `close` got there
//! first.

use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::events::EventSink;
use crate::message::Message;
use crate::registry::Registry;
use crate::router::Router;
use crate::types::SessionId;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Accepted, waiting for the username line
    Connecting = 0,
    /// Handshake done, registered, relaying
    Active = 1,
    /// Terminal; the session is single-use
    Closed = 2,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SessionState::Connecting,
            1 => SessionState::Active,
            _ => SessionState::Closed,
        }
    }
}

/// One connected peer, as seen by the relay
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    /// Username; unset until the handshake completes
    username: OnceLock<String>,
    state: AtomicU8,
    /// Write half of the connection; serializes concurrent sends
    writer: Mutex<OwnedWriteHalf>,
}

impl Session {
    /// Create a session in `Connecting` around the write half of a stream
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            id: SessionId::new(),
            username: OnceLock::new(),
            state: AtomicU8::new(SessionState::Connecting as u8),
            writer: Mutex::new(writer),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// The username, once the handshake has set it
    pub fn username(&self) -> Option<&str> {
        self.username.get().map(String::as_str)
    }

    /// Username for logging; "Unknown" before handshake
    pub fn display_name(&self) -> &str {
        self.username().unwrap_or("Unknown")
    }

    /// Record the username from the handshake line. Set-once; a second
    /// call is ignored.
    pub fn set_username(&self, username: String) {
        let _ = self.username.set(username);
    }

    /// Transition `Connecting → Active` after a successful handshake
    pub fn activate(&self) {
        self.state
            .store(SessionState::Active as u8, Ordering::Release);
    }

    /// Transition to `Closed`. Returns true for the caller that performed
    /// the transition; false if the session was already closed.
    fn begin_close(&self) -> bool {
        self.state.swap(SessionState::Closed as u8, Ordering::AcqRel) != SessionState::Closed as u8
    }

    /// Write one line to the peer, appending the `\n` record separator
    ///
    /// Serialized internally; safe to call from any task. The caller is
    /// responsible for closing the session when this fails.
    pub async fn send(&self, line: &str) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await
    }

    /// Tear the session down: deregister, emit the disconnect event, and
    /// shut the socket (best-effort, close errors swallowed)
    ///
    /// Safe to call concurrently with an in-progress read or from the
    /// router after a failed write; only the first caller does anything.
    /// A session closed before handshake deregisters nothing and emits
    /// nothing.
    pub async fn close(&self, registry: &Registry, events: &dyn EventSink) {
        if !self.begin_close() {
            return;
        }
        registry.remove(self);
        if let Some(username) = self.username() {
            events.on_disconnect(username);
            events.on_roster_changed(&registry.snapshot());
        }
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

/// Drive one accepted connection to completion
///
/// Blocks on the first line and takes it, verbatim, as the username (no
/// trimming or validation, and no uniqueness check). Every later line is
/// relayed through the router as a broadcast message tagged with this
/// session as origin. Returns when the peer disconnects or errors, or on
/// the first line after the session has been closed from elsewhere; a
/// peer that drops before sending a username comes and goes without a
/// trace.
pub async fn run_session(
    stream: TcpStream,
    registry: Arc<Registry>,
    router: Arc<Router>,
    events: Arc<dyn EventSink>,
) {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let (read_half, write_half) = stream.into_split();
    let session = Arc::new(Session::new(write_half));
    let mut lines = BufReader::new(read_half).lines();

    // Handshake: first line is the username
    let username = match lines.next_line().await {
        Ok(Some(line)) => line,
        Ok(None) | Err(_) => {
            debug!("{} dropped before handshake", peer_addr);
            session.close(&registry, &*events).await;
            return;
        }
    };

    session.set_username(username.clone());
    session.activate();
    registry.add(session.clone());
    info!("'{}' connected from {}", username, peer_addr);
    events.on_connect(&username);
    events.on_roster_changed(&registry.snapshot());

    // Relay loop: every line is already a formatted display string
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                // The router or an external close may have closed this
                // session out from under the read loop; Closed is
                // terminal, so nothing more is relayed
                if !session.is_active() {
                    break;
                }
                router
                    .route(Message::broadcast(username.as_str(), line).with_origin(session.id()))
                    .await;
            }
            Ok(None) => break,
            Err(e) => {
                debug!("read error for '{}': {}", username, e);
                break;
            }
        }
    }

    info!("'{}' disconnected", username);
    session.close(&registry, &*events).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::router::Router;
    use crate::testutil::{active_session, socket_pair, Event, RecordingSink};

    #[tokio::test]
    async fn test_state_machine() {
        let (_client, accepted) = socket_pair().await;
        let (_read, write) = accepted.into_split();
        let session = Session::new(write);

        assert_eq!(session.state(), SessionState::Connecting);
        assert!(!session.is_active());
        assert_eq!(session.display_name(), "Unknown");

        session.set_username("alice".to_string());
        session.activate();
        assert!(session.is_active());
        assert_eq!(session.username(), Some("alice"));

        assert!(session.begin_close());
        assert!(!session.begin_close());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_send_appends_newline() {
        let (session, client) = active_session("alice").await;
        session.send("alice: hi").await.unwrap();

        let mut lines = BufReader::new(client).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(line, "alice: hi");
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let registry = Registry::new();
        let sink = RecordingSink::default();
        let (session, _client) = active_session("alice").await;
        registry.add(session.clone());

        session.close(&registry, &sink).await;
        session.close(&registry, &sink).await;

        assert!(registry.is_empty());
        let disconnects = sink
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Disconnect(_)))
            .count();
        assert_eq!(disconnects, 1);
    }

    #[tokio::test]
    async fn test_close_before_handshake_emits_nothing() {
        let registry = Registry::new();
        let sink = RecordingSink::default();
        let (_client, accepted) = socket_pair().await;
        let (_read, write) = accepted.into_split();
        let session = Session::new(write);

        session.close(&registry, &sink).await;
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_run_session_handshake_failure() {
        let registry = Arc::new(Registry::new());
        let sink = Arc::new(RecordingSink::default());
        let router = Arc::new(Router::new(registry.clone(), sink.clone()));

        let (client, accepted) = socket_pair().await;
        let task = tokio::spawn(run_session(
            accepted,
            registry.clone(),
            router,
            sink.clone(),
        ));

        // Peer vanishes without ever sending a username
        drop(client);
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();

        assert!(registry.is_empty());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_closed_session_stops_relaying() {
        let registry = Arc::new(Registry::new());
        let sink = Arc::new(RecordingSink::default());
        let router = Arc::new(Router::new(registry.clone(), sink.clone()));

        let (ann, mut ann_wire) = active_session("ann").await;
        registry.add(ann);

        let (mut bob_wire, accepted) = socket_pair().await;
        let task = tokio::spawn(run_session(
            accepted,
            registry.clone(),
            router,
            sink.clone(),
        ));

        bob_wire.write_all(b"bob\n").await.unwrap();
        timeout(Duration::from_secs(5), async {
            while registry.lookup("bob").is_none() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("bob never registered");

        // Force-disconnect bob while his peer keeps the socket open
        let bob = registry.lookup("bob").unwrap();
        bob.close(&registry, sink.as_ref()).await;
        assert_eq!(bob.state(), SessionState::Closed);

        // Lines arriving after the close are not relayed
        bob_wire.write_all(b"bob: still here\n").await.unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();

        let mut buf = [0u8; 1];
        let stray = timeout(Duration::from_millis(200), ann_wire.read(&mut buf)).await;
        assert!(stray.is_err(), "closed session still relayed a line");

        let disconnects = sink
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Disconnect(_)))
            .count();
        assert_eq!(disconnects, 1);
    }

    #[tokio::test]
    async fn test_run_session_relays_and_cleans_up() {
        let registry = Arc::new(Registry::new());
        let sink = Arc::new(RecordingSink::default());
        let router = Arc::new(Router::new(registry.clone(), sink.clone()));

        let (ann, ann_wire) = active_session("ann").await;
        registry.add(ann);

        let (mut bob_wire, accepted) = socket_pair().await;
        let task = tokio::spawn(run_session(
            accepted,
            registry.clone(),
            router,
            sink.clone(),
        ));

        bob_wire.write_all(b"bob\nbob: hi\n").await.unwrap();

        // ann receives bob's line exactly as sent
        let mut ann_lines = BufReader::new(ann_wire).lines();
        let line = timeout(Duration::from_secs(5), ann_lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(line, "bob: hi");

        drop(bob_wire);
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();

        let events = sink.events();
        assert!(events.contains(&Event::Connect("bob".to_string())));
        assert!(events.contains(&Event::Message("bob: hi".to_string(), false)));
        assert!(events.contains(&Event::Disconnect("bob".to_string())));
        assert_eq!(registry.snapshot(), vec!["ann".to_string()]);
    }
}
