//! Session registry
//!
//! The one piece of state shared across connection tasks: an
//! insertion-ordered list of active sessions, keyed by username at lookup
//! time. Connection churn is rare next to message throughput, so the list
//! is copy-on-write: mutators clone the vector and swap a fresh `Arc` in
//! under a short write lock, while readers clone the `Arc` out and iterate
//! their snapshot without holding any lock. A broadcast mid-iteration is
//! never blocked by, and never observes, a concurrent add or remove.
//!
//! Duplicate usernames are allowed and kept; `lookup` resolves ties by
//! first match in insertion order, and `remove` evicts by session
//! identity so a stale duplicate can go without taking a newer session
//! with the same name.

use std::sync::{Arc, RwLock};

use crate::session::Session;

/// Live collection of sessions, in insertion order
#[derive(Debug, Default)]
pub struct Registry {
    sessions: RwLock<Arc<Vec<Arc<Session>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session unconditionally; duplicates by username are kept
    pub fn add(&self, session: Arc<Session>) {
        let mut guard = self.sessions.write().expect("registry lock poisoned");
        let mut next = guard.as_ref().clone();
        next.push(session);
        *guard = Arc::new(next);
    }

    /// Remove this specific session instance. Idempotent; a session under
    /// the same username but a different identity is untouched.
    pub fn remove(&self, session: &Session) {
        let mut guard = self.sessions.write().expect("registry lock poisoned");
        if guard.iter().any(|s| s.id() == session.id()) {
            let next: Vec<_> = guard
                .iter()
                .filter(|s| s.id() != session.id())
                .cloned()
                .collect();
            *guard = Arc::new(next);
        }
    }

    /// Snapshot of the live session handles, in insertion order
    ///
    /// Cheap (one `Arc` clone); the returned list is immune to concurrent
    /// mutation.
    pub fn sessions(&self) -> Arc<Vec<Arc<Session>>> {
        self.sessions.read().expect("registry lock poisoned").clone()
    }

    /// First active session whose username matches, case-insensitively
    pub fn lookup(&self, username: &str) -> Option<Arc<Session>> {
        self.sessions()
            .iter()
            .find(|s| {
                s.is_active()
                    && s.username()
                        .is_some_and(|name| name.eq_ignore_ascii_case(username))
            })
            .cloned()
    }

    /// Usernames of the currently active sessions, in insertion order
    pub fn snapshot(&self) -> Vec<String> {
        self.sessions()
            .iter()
            .filter(|s| s.is_active())
            .filter_map(|s| s.username().map(String::from))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
