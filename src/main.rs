//! WebSocket Chat Hub - Entry Point
//!
//! Loads configuration, binds the listener and serves connections.

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_hub::{serve, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_hub=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_hub=info")),
        )
        .init();

    let config = Config::from_env()?;

    // Start TCP listener
    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;
    info!("WebSocket Chat Hub listening on {}", addr);
    info!(
        "Accepted chat codes: {}",
        config
            .chat_codes
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    serve(listener, config).await?;

    Ok(())
}
