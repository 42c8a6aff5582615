//! End-to-end encrypted room relay
//!
//! Clients join 8-digit rooms over a persistent TCP connection and
//! exchange newline-delimited messages. Payloads are encrypted on the
//! client with a room key shared out of band; the server only routes
//! opaque lines between members of the same room.
//!
//! # Features
//! - Line-based handshake (`name`, `create` / `connect <code>`)
//! - Room creation with collision-checked 8-digit codes
//! - Join/leave notices and fan-out to every other member
//! - Bounded per-member outbound queues and write timeouts
//! - ChaCha20-Poly1305 client-side codec with Base64 on the wire
//!
//! # Architecture
//! - `RoomRegistry` owns the code → room map behind one lock
//! - Each `Room` guards its own member list
//! - Each connection runs a `handler` task plus a writer task
//!
//! # Example
//! ```ignore
//! use secure_relay::{RelayServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = RelayServer::bind(ServerConfig::default()).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handler;
pub mod member;
pub mod message;
pub mod registry;
pub mod room;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use config::ServerConfig;
pub use error::{AppError, ClientError, CryptoError, SendError};
pub use handler::handle_connection;
pub use member::Member;
pub use message::{ClientCommand, ServerMessage};
pub use registry::RoomRegistry;
pub use room::Room;
pub use server::RelayServer;
pub use types::{MemberId, RoomCode};
