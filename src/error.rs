//! Error types for the relay
//!
//! Defines session errors, outbound queue errors, codec errors and
//! client-side errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Server-side session errors
///
/// Covers both fatal errors (connection termination) and
/// protocol errors (reported to the client with an `ERROR:` line).
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the stream
    #[error("Connection closed")]
    ConnectionClosed,

    /// Room not found with the given code
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// First post-identity line was neither `create` nor `connect`
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Display name rejected
    #[error("Invalid username: {0}")]
    InvalidUsername(&'static str),

    /// Room code is not exactly 8 digits
    #[error("Invalid room code: {0}")]
    InvalidRoomCode(String),

    /// A line was not valid UTF-8
    #[error("Line is not valid UTF-8")]
    InvalidEncoding,

    /// A single line exceeded the configured limit
    #[error("Line exceeds {0} bytes")]
    LineTooLong(usize),

    /// Outbound queue for this session is gone
    #[error("Send error: {0}")]
    Send(#[from] SendError),
}

impl AppError {
    /// Whether the error is a protocol violation the client should hear about.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            AppError::RoomNotFound(_)
                | AppError::UnknownCommand(_)
                | AppError::InvalidUsername(_)
                | AppError::InvalidRoomCode(_)
                | AppError::InvalidEncoding
                | AppError::LineTooLong(_)
        )
    }
}

/// Message send errors
///
/// Occurs when enqueueing a line for a member whose queue is full or closed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The member's outbound queue is at capacity
    #[error("Queue full")]
    QueueFull,

    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Symmetric codec errors
///
/// Wrong key and tampered ciphertext both surface as `AuthenticationFailed`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Key does not decode to 32 bytes
    #[error("Invalid encryption key")]
    InvalidKey,

    /// Ciphertext is not valid Base64 or is shorter than a nonce
    #[error("Malformed ciphertext")]
    Malformed,

    /// Tag verification failed
    #[error("Decryption failed (wrong key or corrupted data)")]
    AuthenticationFailed,

    /// The OS random source could not be read
    #[error("Random source failure")]
    RandomSourceFailure,
}

/// Client-side errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// IO error talking to the server
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Codec failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Server replied with `ERROR:<reason>`
    #[error("{0}")]
    Rejected(String),

    /// Server replied with something the handshake did not expect
    #[error("Unexpected response: {0}")]
    UnexpectedReply(String),

    /// Server closed the connection
    #[error("Server closed the connection")]
    ServerClosed,

    /// Reachability check failed
    #[error("Cannot reach server at {0}")]
    Unreachable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_errors_are_reported() {
        assert!(AppError::RoomNotFound("00000000".into()).is_protocol());
        assert!(AppError::UnknownCommand("join".into()).is_protocol());
        assert!(AppError::LineTooLong(16).is_protocol());
        assert!(AppError::InvalidEncoding.is_protocol());
    }

    #[test]
    fn test_transport_errors_are_silent() {
        assert!(!AppError::ConnectionClosed.is_protocol());
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(!AppError::Io(io).is_protocol());
        assert!(!AppError::Send(SendError::ChannelClosed).is_protocol());
    }
}
