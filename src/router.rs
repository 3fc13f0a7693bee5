//! Message routing
//!
//! The router turns a `Message`'s destination selector into concrete
//! deliveries. Broadcast walks a registry snapshot in insertion order and
//! writes to each active session independently; one recipient's dead
//! socket closes that session but never stops the rest of the fan-out.
//! Directed delivery goes to the first case-insensitive username match.
//! A destination nobody answers to is dropped silently: no error reaches
//! the caller or the sender, only a debug log line.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::events::EventSink;
use crate::message::{Destination, Message};
use crate::registry::Registry;
use crate::session::Session;

/// Resolves destinations and dispatches delivery
pub struct Router {
    registry: Arc<Registry>,
    events: Arc<dyn EventSink>,
}

impl Router {
    pub fn new(registry: Arc<Registry>, events: Arc<dyn EventSink>) -> Self {
        Self { registry, events }
    }

    /// Deliver a message to its destination(s). Never fails; every
    /// delivery is independent best-effort.
    pub async fn route(&self, message: Message) {
        self.events.on_message(&message.body, message.from_operator());

        match &message.destination {
            Destination::Broadcast => {
                for session in self.registry.sessions().iter() {
                    // Never send the sender a second copy of its own line
                    if message.origin == Some(session.id()) {
                        continue;
                    }
                    if !session.is_active() {
                        continue;
                    }
                    self.deliver(session, &message.body).await;
                }
            }
            Destination::User(username) => match self.registry.lookup(username) {
                Some(session) => self.deliver(&session, &message.body).await,
                None => {
                    debug!("no active session named '{}', message dropped", username);
                }
            },
        }
    }

    /// Write one line to one session; a failed write closes that session
    async fn deliver(&self, session: &Arc<Session>, body: &str) {
        if let Err(e) = session.send(body).await {
            warn!("write to '{}' failed: {}", session.display_name(), e);
            session.close(&self.registry, &*self.events).await;
        }
    }
}
