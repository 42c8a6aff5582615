//! Line protocol definitions
//!
//! Newline-terminated UTF-8 text in both directions. The server renders
//! `ServerMessage` with `Display`; clients read lines back with
//! `ServerMessage::parse`. Chat payloads are opaque to the relay.

use std::fmt;

use crate::error::AppError;
use crate::types::RoomCode;

const CODE_PREFIX: &str = "CODE:";
const OK_PREFIX: &str = "OK:Connected to room ";
const ERROR_PREFIX: &str = "ERROR:";
const JOINED_PREFIX: &str = ">>> ";
const JOINED_SUFFIX: &str = " joined the room";
const LEFT_PREFIX: &str = "<<< ";
const LEFT_SUFFIX: &str = " left the room";

/// Client → Server command (second handshake line)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Create a new room
    Create,
    /// Join an existing room by code
    Connect,
}

impl ClientCommand {
    /// Parse a command line; matching is exact and case-sensitive
    pub fn parse(line: &str) -> Result<Self, AppError> {
        match line.trim() {
            "create" => Ok(ClientCommand::Create),
            "connect" => Ok(ClientCommand::Connect),
            other => Err(AppError::UnknownCommand(other.to_string())),
        }
    }

    /// Wire form of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientCommand::Create => "create",
            ClientCommand::Connect => "connect",
        }
    }
}

/// Server → Client line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Room created successfully
    RoomCreated { room_code: RoomCode },
    /// Room joined successfully
    RoomJoined { room_code: RoomCode },
    /// Another member joined the room
    MemberJoined { username: String },
    /// Another member left the room
    MemberLeft { username: String },
    /// Chat payload relayed from another member
    Chat { from: String, content: String },
    /// Error occurred; the server closes the connection after this
    Error { message: String },
}

impl ServerMessage {
    /// Parse one line received from the server (terminator optional)
    ///
    /// Returns None for lines that match no known shape.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(code) = line.strip_prefix(CODE_PREFIX) {
            return RoomCode::parse(code).map(|room_code| ServerMessage::RoomCreated { room_code });
        }
        if let Some(code) = line.strip_prefix(OK_PREFIX) {
            return RoomCode::parse(code).map(|room_code| ServerMessage::RoomJoined { room_code });
        }
        if let Some(message) = line.strip_prefix(ERROR_PREFIX) {
            return Some(ServerMessage::Error {
                message: message.to_string(),
            });
        }
        if let Some(rest) = line.strip_prefix(JOINED_PREFIX) {
            return rest.strip_suffix(JOINED_SUFFIX).map(|name| ServerMessage::MemberJoined {
                username: name.to_string(),
            });
        }
        if let Some(rest) = line.strip_prefix(LEFT_PREFIX) {
            return rest.strip_suffix(LEFT_SUFFIX).map(|name| ServerMessage::MemberLeft {
                username: name.to_string(),
            });
        }
        // Payloads are Base64 and never contain "] ", so split on the last one
        if let Some(rest) = line.strip_prefix('[') {
            return rest.rsplit_once("] ").map(|(from, content)| ServerMessage::Chat {
                from: from.to_string(),
                content: content.to_string(),
            });
        }
        None
    }

    /// Render as a wire line including the trailing newline
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::RoomCreated { room_code } => write!(f, "{CODE_PREFIX}{room_code}"),
            ServerMessage::RoomJoined { room_code } => write!(f, "{OK_PREFIX}{room_code}"),
            ServerMessage::MemberJoined { username } => {
                write!(f, "{JOINED_PREFIX}{username}{JOINED_SUFFIX}")
            }
            ServerMessage::MemberLeft { username } => {
                write!(f, "{LEFT_PREFIX}{username}{LEFT_SUFFIX}")
            }
            ServerMessage::Chat { from, content } => write!(f, "[{from}] {content}"),
            ServerMessage::Error { message } => write!(f, "{ERROR_PREFIX}{message}"),
        }
    }
}

/// Convert AppError to ServerMessage for client notification
impl From<&AppError> for ServerMessage {
    fn from(err: &AppError) -> Self {
        let message = match err {
            AppError::RoomNotFound(_) => "Room not found",
            AppError::UnknownCommand(_) => "Unknown command. Use 'create' or 'connect'",
            AppError::InvalidUsername(_) => "Invalid username",
            AppError::InvalidRoomCode(_) => "Invalid room code",
            AppError::LineTooLong(_) => "Line too long",
            AppError::InvalidEncoding => "Invalid encoding",
            // Fatal errors are not typically converted (connection closes)
            _ => "Internal error",
        };
        ServerMessage::Error {
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_command_parse() {
        assert_eq!(ClientCommand::parse("create\n").unwrap(), ClientCommand::Create);
        assert_eq!(ClientCommand::parse("connect\r\n").unwrap(), ClientCommand::Connect);
        assert!(matches!(
            ClientCommand::parse("CREATE"),
            Err(AppError::UnknownCommand(_))
        ));
        assert!(ClientCommand::parse("").is_err());
    }

    #[test]
    fn test_server_message_lines() {
        let code = RoomCode::from_number(12_345_678);
        assert_eq!(
            ServerMessage::RoomCreated { room_code: code.clone() }.to_line(),
            "CODE:12345678\n"
        );
        assert_eq!(
            ServerMessage::RoomJoined { room_code: code }.to_line(),
            "OK:Connected to room 12345678\n"
        );
        assert_eq!(
            ServerMessage::MemberJoined { username: "Bob".into() }.to_line(),
            ">>> Bob joined the room\n"
        );
        assert_eq!(
            ServerMessage::MemberLeft { username: "Bob".into() }.to_line(),
            "<<< Bob left the room\n"
        );
        assert_eq!(
            ServerMessage::Chat { from: "Alice".into(), content: "aGk=".into() }.to_line(),
            "[Alice] aGk=\n"
        );
    }

    #[test]
    fn test_error_reply_text() {
        let msg = ServerMessage::from(&AppError::RoomNotFound("00000000".into()));
        assert_eq!(msg.to_line(), "ERROR:Room not found\n");

        let msg = ServerMessage::from(&AppError::InvalidEncoding);
        assert_eq!(msg.to_line(), "ERROR:Invalid encoding\n");
    }

    #[test]
    fn test_parse_server_lines() {
        assert_eq!(
            ServerMessage::parse("CODE:00000042\n"),
            Some(ServerMessage::RoomCreated { room_code: RoomCode::from_number(42) })
        );
        assert_eq!(
            ServerMessage::parse("ERROR:Room not found"),
            Some(ServerMessage::Error { message: "Room not found".into() })
        );
        assert_eq!(
            ServerMessage::parse("[a] b] c2VjcmV0"),
            Some(ServerMessage::Chat { from: "a] b".into(), content: "c2VjcmV0".into() })
        );
        assert_eq!(
            ServerMessage::parse("<<< Bob left the room"),
            Some(ServerMessage::MemberLeft { username: "Bob".into() })
        );
        assert_eq!(ServerMessage::parse("CODE:123"), None);
        assert_eq!(ServerMessage::parse("hello"), None);
    }
}
