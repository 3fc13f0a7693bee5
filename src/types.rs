//! Basic type definitions for the relay
//!
//! Provides the `SessionId` newtype: a UUID-based identifier for one
//! accepted connection. Usernames are not unique (duplicates are allowed
//! by design), so registry removal and broadcast echo suppression key on
//! the session instance, not the name.

use uuid::Uuid;

/// Unique session identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe identification of a single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
