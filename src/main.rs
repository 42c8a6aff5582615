//! Relay server - Entry Point
//!
//! Starts the TCP listener and serves rooms until Ctrl-C.

use std::env;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use secure_relay::{RelayServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=secure_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("secure_relay=info")),
        )
        .init();

    // Bind address: first argument, then RELAY_BIND_ADDR, then default
    let mut config = ServerConfig::from_env();
    if let Some(addr) = env::args().nth(1) {
        config.bind_addr = addr;
    }

    let server = RelayServer::bind(config).await?;
    info!("Relay server listening on {}", server.local_addr()?);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}
