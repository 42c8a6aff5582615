//! Room struct definition
//!
//! An ordered set of connected members plus broadcast. Every operation
//! takes the room's own lock; nothing under it waits on a socket, since
//! delivery only enqueues onto each member's bounded outbound queue.

use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::SendError;
use crate::member::Member;
use crate::message::ServerMessage;
use crate::types::{MemberId, RoomCode};

/// Chat room
///
/// Members are kept in insertion order. Payloads are opaque here.
#[derive(Debug)]
pub struct Room {
    /// Room code for identification
    code: RoomCode,
    /// Room creation time
    created_at: Instant,
    /// Current members, insertion order
    members: Mutex<Vec<Member>>,
}

impl Room {
    /// Create a new, empty room with the given code
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            created_at: Instant::now(),
            members: Mutex::new(Vec::new()),
        }
    }

    /// Room code
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Time the room was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Append a member
    pub async fn add_member(&self, member: Member) {
        self.members.lock().await.push(member);
    }

    /// Remove a member by identity; no-op if absent
    pub async fn remove_member(&self, id: MemberId) -> Option<Member> {
        let mut members = self.members.lock().await;
        take_member(&mut members, id)
    }

    /// Deliver `msg` to every member except `excluding`
    ///
    /// Returns the number of members the message was queued for.
    pub async fn broadcast(&self, msg: &ServerMessage, excluding: Option<MemberId>) -> usize {
        let members = self.members.lock().await;
        self.fan_out(&members, msg, excluding)
    }

    /// Current number of members
    pub async fn member_count(&self) -> usize {
        self.members.lock().await.len()
    }

    /// Add a member and announce it to the others in one critical section
    pub async fn admit(&self, member: Member, notice: &ServerMessage) {
        let mut members = self.members.lock().await;
        let id = member.id;
        members.push(member);
        self.fan_out(&members, notice, Some(id));
    }

    /// Remove a member and announce its departure in one critical section
    ///
    /// Returns the number of members left, or None if `id` was not here.
    pub async fn depart(&self, id: MemberId, notice: &ServerMessage) -> Option<usize> {
        let mut members = self.members.lock().await;
        take_member(&mut members, id)?;
        self.fan_out(&members, notice, None);
        Some(members.len())
    }

    fn fan_out(&self, members: &[Member], msg: &ServerMessage, excluding: Option<MemberId>) -> usize {
        let mut delivered = 0;
        for member in members.iter().filter(|m| Some(m.id) != excluding) {
            match member.deliver(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(SendError::QueueFull) => {
                    warn!(
                        "Room {}: queue full for {}, message dropped",
                        self.code, member.id
                    );
                }
                Err(SendError::ChannelClosed) => {
                    // Its own handler will notice and clean up
                    debug!("Room {}: {} already disconnected", self.code, member.id);
                }
            }
        }
        delivered
    }
}

fn take_member(members: &mut Vec<Member>, id: MemberId) -> Option<Member> {
    let pos = members.iter().position(|m| m.id == id)?;
    Some(members.remove(pos))
}
