//! TCP accept loop
//!
//! Binds the configured address and accepts connections forever, spawning
//! one task per connection. Bind failure is fatal and propagates to the
//! caller; a transient accept error is logged and the loop keeps going.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::RelayError;
use crate::events::EventSink;
use crate::registry::Registry;
use crate::router::Router;
use crate::session::run_session;

/// Accepts inbound connections and hands them to session tasks
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind the listen address. The address is injected, never hardcoded;
    /// failure here means the relay cannot start.
    pub async fn bind(addr: &str) -> Result<Self, RelayError> {
        let inner = TcpListener::bind(addr)
            .await
            .map_err(|source| RelayError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self { inner })
    }

    /// The address actually bound (useful when binding port 0)
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accept connections until the process exits
    pub async fn run(
        self,
        registry: Arc<Registry>,
        router: Arc<Router>,
        events: Arc<dyn EventSink>,
    ) {
        loop {
            match self.inner.accept().await {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    tokio::spawn(run_session(
                        stream,
                        registry.clone(),
                        router.clone(),
                        events.clone(),
                    ));
                }
                Err(e) => {
                    // Per-connection accept errors never take the listener down
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}
