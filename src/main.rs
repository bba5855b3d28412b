//! Line-based TCP Chat Server - Entry Point
//!
//! Starts the TCP listener and ChatHub actor, accepting connections.

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_hub::{accept_loop, ChatHub, ServerConfig};

/// Channel buffer size for hub commands
const CHANNEL_BUFFER_SIZE: usize = 256;

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

    let config = ServerConfig::parse();
    info!(?config, "Loaded configuration");

    // Start TCP listener
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Chat server listening on {}", addr);

    // Create ChatHub actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    let hub = ChatHub::new(config.hub.clone(), cmd_rx);
    tokio::spawn(hub.run());

    info!("ChatHub actor started");

    tokio::select! {
        _ = accept_loop(listener, cmd_tx, config.max_line_length) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
