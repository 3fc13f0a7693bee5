//! Multi-Client TCP Chat Relay Library
//!
//! A minimal line-oriented chat relay built on tokio: clients connect over
//! TCP, send their username as the first line, and every later line is
//! relayed to the other connected clients. The embedding layer can also
//! inject its own messages, broadcast or addressed to one user.
//!
//! # Features
//! - Newline-delimited UTF-8 wire protocol, relayed verbatim
//! - Username handshake on the first line (no uniqueness enforcement)
//! - Broadcast routing with sender echo suppression
//! - Directed messages with case-insensitive recipient lookup
//! - Copy-on-write session registry; readers never block on writers
//! - Lifecycle/message events through a pluggable `EventSink`
//!
//! # Architecture
//! One task per connection plus one for the accept loop:
//! - `Listener` accepts and spawns `run_session` tasks
//! - each `Session` reads lines and hands them to the `Router`
//! - the `Router` resolves destinations through the shared `Registry`
//! - writes go through each session's internal write lock, so concurrent
//!   broadcasts never interleave bytes on one connection
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use chat_relay::{EventSink, Listener, LogSink, Registry, Router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), chat_relay::RelayError> {
//!     let registry = Arc::new(Registry::new());
//!     let events: Arc<dyn EventSink> = Arc::new(LogSink);
//!     let router = Arc::new(Router::new(registry.clone(), events.clone()));
//!
//!     let listener = Listener::bind("localhost:12345").await?;
//!     listener.run(registry, router, events).await;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod events;
pub mod listener;
pub mod message;
pub mod registry;
pub mod router;
pub mod session;
pub mod types;

#[cfg(test)]
mod testutil;

// Re-export main types for convenience
pub use error::RelayError;
pub use events::{EventSink, LogSink};
pub use listener::Listener;
pub use message::{Destination, Message};
pub use registry::Registry;
pub use router::Router;
pub use session::{run_session, Session, SessionState};
pub use types::SessionId;
