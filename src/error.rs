//! Error types for the relay
//!
//! Uses thiserror for ergonomic error definitions. Transport errors on a
//! live session are handled locally (the session closes and deregisters)
//! and never surface through this type; `RelayError` covers the failures
//! that do propagate.

use thiserror::Error;

/// Relay-level errors
#[derive(Debug, Error)]
pub enum RelayError {
    /// Listener could not bind its address (fatal at startup, no retry)
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
