//! Listener and dispatcher
//!
//! Accepts TCP connections and spawns one handler task per connection,
//! each sharing the same room registry.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::registry::RoomRegistry;

/// Relay server bound to a listening socket
pub struct RelayServer {
    listener: TcpListener,
    registry: Arc<RoomRegistry>,
    config: Arc<ServerConfig>,
}

impl RelayServer {
    /// Bind to `config.bind_addr`
    pub async fn bind(config: ServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        Ok(Self {
            listener,
            registry: Arc::new(RoomRegistry::new()),
            config: Arc::new(config),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared registry handle
    pub fn registry(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.registry)
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.dispatch(stream, addr),
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
            }
        }
    }

    /// Accept connections forever
    pub async fn run(self) {
        self.run_until(std::future::pending()).await;
    }

    fn dispatch(&self, stream: tokio::net::TcpStream, addr: SocketAddr) {
        info!("New connection from {}", addr);
        let registry = Arc::clone(&self.registry);
        let config = Arc::clone(&self.config);

        // Spawn handler task for each connection
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr.to_string(), registry, config).await {
                error!("Connection handler error ({}): {}", addr, e);
            }
        });
    }
}
