//! Room registry
//!
//! Process-wide map from room code to room, owned by the server and
//! handed to every connection handler as an `Arc`. One lock guards the
//! map; each room guards its own members, so a busy room never blocks
//! creation or lookup of another.
//!
//! Lock order is always registry, then room.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::AppError;
use crate::member::Member;
use crate::message::ServerMessage;
use crate::room::Room;
use crate::types::{MemberId, RoomCode};

/// Source of candidate room codes
pub type CodeGenerator = fn() -> RoomCode;

/// Registry of live rooms
///
/// Every code in the map refers to a room with at least one member,
/// except transiently for rooms made with [`RoomRegistry::create`].
pub struct RoomRegistry {
    /// All active rooms: RoomCode -> Room
    rooms: Mutex<HashMap<RoomCode, Arc<Room>>>,
    /// Candidate code source, re-drawn on collision
    generate: CodeGenerator,
}

impl RoomRegistry {
    /// Create an empty registry drawing codes from [`RoomCode::generate`]
    pub fn new() -> Self {
        Self::with_generator(RoomCode::generate)
    }

    /// Create an empty registry with a custom code source
    pub fn with_generator(generate: CodeGenerator) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            generate,
        }
    }

    /// Insert a new empty room under a fresh code and return the code
    pub async fn create(&self) -> RoomCode {
        let mut rooms = self.rooms.lock().await;
        let code = self.unused_code(&rooms);
        rooms.insert(code.clone(), Arc::new(Room::new(code.clone())));
        debug!("Room {} created", code);
        code
    }

    /// Find a room by code
    pub async fn lookup(&self, code: &RoomCode) -> Result<Arc<Room>, AppError> {
        self.rooms
            .lock()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| AppError::RoomNotFound(code.to_string()))
    }

    /// Remove a room; the caller must already have seen it empty
    pub async fn delete(&self, code: &RoomCode) {
        if self.rooms.lock().await.remove(code).is_some() {
            debug!("Room {} deleted", code);
        }
    }

    /// Number of live rooms
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Create a room with `member` as its first member
    ///
    /// The `CODE:` reply is queued before the room becomes visible.
    pub async fn open_room(&self, member: Member) -> Result<Arc<Room>, AppError> {
        let mut rooms = self.rooms.lock().await;
        let code = self.unused_code(&rooms);

        member.deliver(ServerMessage::RoomCreated {
            room_code: code.clone(),
        })?;

        let room = Arc::new(Room::new(code.clone()));
        info!("{} ({}) created room {}", member.username, member.id, code);
        room.add_member(member).await;
        rooms.insert(code, Arc::clone(&room));

        debug!("Total rooms: {}", rooms.len());
        Ok(room)
    }

    /// Add `member` to an existing room and announce it
    ///
    /// The `OK:` reply is queued before any broadcast can reach the member.
    pub async fn join_room(&self, code: &RoomCode, member: Member) -> Result<Arc<Room>, AppError> {
        let rooms = self.rooms.lock().await;
        let room = rooms
            .get(code)
            .cloned()
            .ok_or_else(|| AppError::RoomNotFound(code.to_string()))?;

        member.deliver(ServerMessage::RoomJoined {
            room_code: code.clone(),
        })?;

        info!("{} ({}) joined room {}", member.username, member.id, code);
        let notice = ServerMessage::MemberJoined {
            username: member.username.clone(),
        };
        room.admit(member, &notice).await;
        Ok(room)
    }

    /// Remove a member, announce the departure, and drop the room if empty
    ///
    /// Returns true if the room was deleted.
    pub async fn leave_room(&self, room: &Arc<Room>, id: MemberId, username: &str) -> bool {
        let mut rooms = self.rooms.lock().await;
        let notice = ServerMessage::MemberLeft {
            username: username.to_string(),
        };

        let Some(remaining) = room.depart(id, &notice).await else {
            return false;
        };
        info!("{} ({}) left room {}", username, id, room.code());

        if remaining > 0 {
            return false;
        }

        // Only drop the entry if it still refers to this room
        let same = rooms
            .get(room.code())
            .is_some_and(|current| Arc::ptr_eq(current, room));
        if same {
            rooms.remove(room.code());
            info!(
                "Room {} deleted (empty, lived {:?})",
                room.code(),
                room.created_at().elapsed()
            );
        }
        debug!("Total rooms: {}", rooms.len());
        same
    }

    /// Helper: draw codes until one is not in use
    fn unused_code(&self, rooms: &HashMap<RoomCode, Arc<Room>>) -> RoomCode {
        loop {
            let code = (self.generate)();
            if !rooms.contains_key(&code) {
                break code;
            }
            debug!("Room code {} already in use, drawing again", code);
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
