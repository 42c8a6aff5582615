//! Client side of the relay
//!
//! Dials the server, runs the handshake, and splits the connection into
//! an encrypting sender and a decrypting receiver. The room key never
//! leaves this module's callers.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::crypto;
use crate::error::ClientError;
use crate::message::{ClientCommand, ServerMessage};
use crate::types::RoomCode;

/// Shown in place of a message that fails to decrypt
pub const WRONG_KEY_MARKER: &str = "[ENCRYPTED/WRONG KEY]";

/// Check that something is listening at `addr` within `wait`
pub async fn probe(addr: &str, wait: Duration) -> bool {
    matches!(timeout(wait, TcpStream::connect(addr)).await, Ok(Ok(_)))
}

/// Turn one server line into what the user should see
///
/// Chat lines are decrypted with `key`; any codec failure shows the
/// sender with [`WRONG_KEY_MARKER`] instead of the text.
pub fn render_incoming(line: &str, key: &str) -> String {
    match ServerMessage::parse(line) {
        Some(ServerMessage::Chat { from, content }) => match crypto::decrypt(&content, key) {
            Ok(plaintext) => format!("[{from}] {plaintext}"),
            Err(e) => {
                debug!("Message from {} not readable: {}", from, e);
                format!("[{from}] {WRONG_KEY_MARKER}")
            }
        },
        Some(other) => other.to_string(),
        None => line.trim_end().to_string(),
    }
}

/// Connection to a relay server, before the chat starts
pub struct ClientConnection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl ClientConnection {
    /// Dial the server
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, writer) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        })
    }

    /// Handshake as `username` and create a room
    pub async fn create_room(&mut self, username: &str) -> Result<RoomCode, ClientError> {
        self.send_line(username).await?;
        self.send_line(ClientCommand::Create.as_str()).await?;

        match self.reply().await? {
            ServerMessage::RoomCreated { room_code } => Ok(room_code),
            other => Err(ClientError::UnexpectedReply(other.to_string())),
        }
    }

    /// Handshake as `username` and join the room `code`
    pub async fn join_room(&mut self, username: &str, code: &RoomCode) -> Result<(), ClientError> {
        self.send_line(username).await?;
        self.send_line(ClientCommand::Connect.as_str()).await?;
        self.send_line(code.as_str()).await?;

        match self.reply().await? {
            ServerMessage::RoomJoined { .. } => Ok(()),
            other => Err(ClientError::UnexpectedReply(other.to_string())),
        }
    }

    /// Split into the chat halves, both bound to the room key
    pub fn into_chat(self, key: String) -> (ChatReceiver, ChatSender) {
        let receiver = ChatReceiver {
            lines: self.lines,
            key: key.clone(),
        };
        let sender = ChatSender {
            writer: self.writer,
            key,
        };
        (receiver, sender)
    }

    async fn send_line(&mut self, line: &str) -> Result<(), ClientError> {
        write_line(&mut self.writer, line).await
    }

    /// Next handshake reply; `ERROR:` becomes `Rejected`
    async fn reply(&mut self) -> Result<ServerMessage, ClientError> {
        let line = self
            .lines
            .next_line()
            .await?
            .ok_or(ClientError::ServerClosed)?;
        match ServerMessage::parse(&line) {
            Some(ServerMessage::Error { message }) => Err(ClientError::Rejected(message)),
            Some(msg) => Ok(msg),
            None => Err(ClientError::UnexpectedReply(line)),
        }
    }
}

/// Incoming half: yields display-ready lines
pub struct ChatReceiver {
    lines: Lines<BufReader<OwnedReadHalf>>,
    key: String,
}

impl ChatReceiver {
    /// Next line for display, or None when the server closed the connection
    pub async fn next_display(&mut self) -> Result<Option<String>, ClientError> {
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| render_incoming(&line, &self.key)))
    }
}

/// Outgoing half: encrypts and sends
pub struct ChatSender {
    writer: OwnedWriteHalf,
    key: String,
}

impl ChatSender {
    /// Encrypt and send one message; blank input is skipped
    pub async fn send(&mut self, text: &str) -> Result<(), ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let payload = crypto::encrypt(text, &self.key)?;
        write_line(&mut self.writer, &payload).await
    }

    /// Close the write side
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

async fn write_line(writer: &mut OwnedWriteHalf, line: &str) -> Result<(), ClientError> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_decrypts_chat() {
        let key = crypto::generate_key().unwrap();
        let line = format!("[Alice] {}", crypto::encrypt("hi", &key).unwrap());
        assert_eq!(render_incoming(&line, &key), "[Alice] hi");
    }

    #[test]
    fn test_render_wrong_key() {
        let key = crypto::generate_key().unwrap();
        let other = crypto::generate_key().unwrap();
        let line = format!("[Alice] {}", crypto::encrypt("hi", &key).unwrap());
        assert_eq!(
            render_incoming(&line, &other),
            "[Alice] [ENCRYPTED/WRONG KEY]"
        );
    }

    #[test]
    fn test_render_garbage_payload() {
        let key = crypto::generate_key().unwrap();
        assert_eq!(
            render_incoming("[Alice] not-base64!", &key),
            "[Alice] [ENCRYPTED/WRONG KEY]"
        );
    }

    #[test]
    fn test_render_notices_verbatim() {
        let key = crypto::generate_key().unwrap();
        assert_eq!(
            render_incoming(">>> Bob joined the room\n", &key),
            ">>> Bob joined the room"
        );
        assert_eq!(
            render_incoming("<<< Bob left the room", &key),
            "<<< Bob left the room"
        );
        assert_eq!(render_incoming("something else", &key), "something else");
    }

    #[tokio::test]
    async fn test_probe_unreachable() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(!probe(&addr, Duration::from_millis(500)).await);
    }
}
