//! Connection handler
//!
//! Runs the per-connection session: display name, `create`/`connect`,
//! then relays every line as a chat message until the stream closes.
//!
//! ```text
//! AwaitingIdentity -> AwaitingCommand -> Creating | Joining -> InRoom -> Closed
//! ```
//!
//! Outbound lines go through a bounded queue drained by a writer task,
//! so broadcasts never wait on this connection's socket.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::member::Member;
use crate::message::{ClientCommand, ServerMessage};
use crate::registry::RoomRegistry;
use crate::room::Room;
use crate::types::{MemberId, RoomCode};

/// State held once the handshake put this connection in a room
struct Session {
    room: Arc<Room>,
    username: String,
}

/// Handle one accepted connection
///
/// Runs the handshake and chat loop, then removes the member from its
/// room (deleting the room if it became empty). Protocol violations are
/// answered with an `ERROR:` line and end the session with `Ok`;
/// transport failures are returned.
pub async fn handle_connection<S>(
    stream: S,
    peer: String,
    registry: Arc<RoomRegistry>,
    config: Arc<ServerConfig>,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    let member_id = MemberId::new();
    info!("Member {} connected from {}", member_id, peer);

    // Create channel for server -> client messages
    let (msg_tx, msg_rx) = mpsc::channel::<ServerMessage>(config.member_queue_capacity.max(1));
    let mut write_task = tokio::spawn(write_loop(write_half, msg_rx, config.write_timeout));
    let mut writer_done = false;

    let outcome = match handshake(&mut reader, member_id, msg_tx.clone(), &registry, &config).await
    {
        Ok(session) => {
            let outcome = tokio::select! {
                result = chat_loop(&mut reader, member_id, &session, config.max_line_len) => result,
                _ = &mut write_task => {
                    writer_done = true;
                    debug!("Write task completed for {}", member_id);
                    Err(AppError::ConnectionClosed)
                }
            };
            registry
                .leave_room(&session.room, member_id, &session.username)
                .await;
            outcome
        }
        Err(e) => Err(e),
    };

    if let Err(e) = &outcome {
        if e.is_protocol() {
            warn!("Member {}: {}", member_id, e);
            let _ = msg_tx.try_send(ServerMessage::from(e));
        }
    }

    // Closing our sender lets the writer flush what is queued and shut down
    drop(msg_tx);
    if !writer_done {
        let _ = write_task.await;
    }

    info!("Member {} disconnected", member_id);

    match outcome {
        Ok(()) | Err(AppError::ConnectionClosed) => Ok(()),
        Err(e) if e.is_protocol() => Ok(()),
        Err(e) => Err(e),
    }
}

/// AwaitingIdentity through Creating/Joining
async fn handshake<R>(
    reader: &mut R,
    member_id: MemberId,
    sender: mpsc::Sender<ServerMessage>,
    registry: &RoomRegistry,
    config: &ServerConfig,
) -> Result<Session, AppError>
where
    R: AsyncBufRead + Unpin,
{
    let name_line = next_line(reader, config.max_line_len).await?;
    let username = validate_username(&name_line, config.max_username_len)?;
    debug!("Member {} identified as '{}'", member_id, username);

    let command = ClientCommand::parse(&next_line(reader, config.max_line_len).await?)?;
    let member = Member::new(member_id, username.clone(), sender);

    let room = match command {
        ClientCommand::Create => registry.open_room(member).await?,
        ClientCommand::Connect => {
            let code_line = next_line(reader, config.max_line_len).await?;
            let code = RoomCode::parse(&code_line)
                .ok_or_else(|| AppError::InvalidRoomCode(code_line.trim().to_string()))?;
            registry.join_room(&code, member).await?
        }
    };

    Ok(Session { room, username })
}

/// InRoom: every non-empty line is relayed to the other members
async fn chat_loop<R>(
    reader: &mut R,
    member_id: MemberId,
    session: &Session,
    max_line_len: usize,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let Some(payload) = read_line(reader, max_line_len).await? else {
            return Ok(());
        };
        if payload.is_empty() {
            continue;
        }

        debug!(
            "[{}] {}: {} bytes",
            session.room.code(),
            session.username,
            payload.len()
        );

        let msg = ServerMessage::Chat {
            from: session.username.clone(),
            content: payload,
        };
        session.room.broadcast(&msg, Some(member_id)).await;
    }
}

/// Drain the outbound queue onto the socket
///
/// Each write is bounded by `write_timeout`; a stalled peer ends the
/// writer, which in turn ends the session.
async fn write_loop<W>(mut writer: W, mut rx: mpsc::Receiver<ServerMessage>, write_timeout: Duration)
where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = rx.recv().await {
        let line = msg.to_line();
        let write = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        };
        match timeout(write_timeout, write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("Write failed, ending write task: {}", e);
                break;
            }
            Err(_) => {
                warn!("Write stalled for {:?}, dropping connection", write_timeout);
                break;
            }
        }
    }
    let _ = timeout(write_timeout, writer.shutdown()).await;
}

/// Read one line, treating end of stream as a closed connection
async fn next_line<R>(reader: &mut R, max_len: usize) -> Result<String, AppError>
where
    R: AsyncBufRead + Unpin,
{
    read_line(reader, max_len)
        .await?
        .ok_or(AppError::ConnectionClosed)
}

/// Read one `\n`-terminated line of at most `max_len` bytes
///
/// Returns None at end of stream; a trailing unterminated fragment is
/// discarded. The terminator (`\n` or `\r\n`) is stripped and does not
/// count toward `max_len`.
async fn read_line<R>(reader: &mut R, max_len: usize) -> Result<Option<String>, AppError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let limit = max_len as u64 + 2;
    (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;

    if buf.last() != Some(&b'\n') {
        if buf.len() > max_len {
            return Err(AppError::LineTooLong(max_len));
        }
        return Ok(None);
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    if buf.len() > max_len {
        return Err(AppError::LineTooLong(max_len));
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| AppError::InvalidEncoding)
}

/// Check a display name: non-empty, bounded, no control characters
fn validate_username(line: &str, max_len: usize) -> Result<String, AppError> {
    let name = line.trim();
    if name.is_empty() {
        return Err(AppError::InvalidUsername("empty"));
    }
    if name.chars().count() > max_len {
        return Err(AppError::InvalidUsername("too long"));
    }
    if name.chars().any(char::is_control) {
        return Err(AppError::InvalidUsername("control characters"));
    }
    Ok(name.to_string())
}
