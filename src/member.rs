//! Member struct definition
//!
//! Represents one connected participant: identity, display name and
//! the outbound queue drained by the connection's writer task.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::MemberId;

/// Connected room member
///
/// Cloning yields another handle to the same outbound queue; identity
/// is the `id`, never the name.
#[derive(Debug, Clone)]
pub struct Member {
    /// Unique identifier for this connection
    pub id: MemberId,
    /// Validated display name
    pub username: String,
    /// Server → Client message channel
    sender: mpsc::Sender<ServerMessage>,
}

impl Member {
    /// Create a new member with the given ID, name and sender channel
    pub fn new(id: MemberId, username: String, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            username,
            sender,
        }
    }

    /// Queue a message for this member without waiting
    ///
    /// Fails with `QueueFull` when the writer is lagging and with
    /// `ChannelClosed` when the connection is already gone.
    pub fn deliver(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(content: &str) -> ServerMessage {
        ServerMessage::Chat {
            from: "Alice".to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_member_deliver() {
        let (tx, mut rx) = mpsc::channel(4);
        let member = Member::new(MemberId::new(), "Alice".to_string(), tx);

        member.deliver(chat("x")).unwrap();
        assert_eq!(rx.recv().await, Some(chat("x")));
    }

    #[tokio::test]
    async fn test_member_deliver_full_queue() {
        let (tx, _rx) = mpsc::channel(1);
        let member = Member::new(MemberId::new(), "Alice".to_string(), tx);

        member.deliver(chat("1")).unwrap();
        assert_eq!(member.deliver(chat("2")), Err(SendError::QueueFull));
    }

    #[tokio::test]
    async fn test_member_deliver_closed() {
        let (tx, rx) = mpsc::channel(4);
        let member = Member::new(MemberId::new(), "Alice".to_string(), tx);
        drop(rx);

        assert_eq!(member.deliver(chat("x")), Err(SendError::ChannelClosed));
    }
}
