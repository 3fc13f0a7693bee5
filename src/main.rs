//! Multi-Client TCP Chat Relay - Entry Point
//!
//! Binds the listen address and runs the accept loop with a headless
//! logging event sink.

use std::env;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_relay::{EventSink, Listener, LogSink, Registry, Router};

/// Default relay address
const DEFAULT_ADDR: &str = "localhost:12345";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    // Get bind address from command line or use default
    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let registry = Arc::new(Registry::new());
    let events: Arc<dyn EventSink> = Arc::new(LogSink);
    let router = Arc::new(Router::new(registry.clone(), events.clone()));

    // Bind failure is fatal: report and exit, no retry
    let listener = Listener::bind(&addr).await?;
    info!("Chat relay listening on {}", addr);

    listener.run(registry, router, events).await;

    Ok(())
}
