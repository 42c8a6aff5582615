//! Basic type definitions for the relay
//!
//! Provides newtype wrappers for type safety:
//! - `MemberId`: UUID-based unique member identifier
//! - `RoomCode`: 8-digit decimal room code

use uuid::Uuid;

/// Number of decimal digits in a room code
pub const ROOM_CODE_LEN: usize = 8;

/// Size of the room code space (10^8)
const ROOM_CODE_SPACE: u32 = 100_000_000;

/// Unique member identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe member identification.
/// One id per accepted connection, so identity equals stream identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberId(pub Uuid);

impl MemberId {
    /// Create a new random member ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room code (8 decimal digits, zero-padded)
///
/// Human-typeable room identifier. Public, not a secret: the
/// encryption key is what protects message content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    /// Generate a new random room code
    ///
    /// Draws uniformly over the full 8-digit space from the thread-local
    /// CSPRNG. Uniqueness is the registry's job.
    pub fn generate() -> Self {
        use rand::Rng;
        let n = rand::thread_rng().gen_range(0..ROOM_CODE_SPACE);
        Self::from_number(n)
    }

    /// Build a code from a number, reduced modulo 10^8 and zero-padded
    pub fn from_number(n: u32) -> Self {
        Self(format!("{:0width$}", n % ROOM_CODE_SPACE, width = ROOM_CODE_LEN))
    }

    /// Parse user or wire input; surrounding whitespace is ignored
    ///
    /// Returns None unless the input is exactly 8 ASCII digits.
    pub fn parse(input: &str) -> Option<Self> {
        let code = input.trim();
        if code.len() == ROOM_CODE_LEN && code.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(code.to_string()))
        } else {
            None
        }
    }

    /// Borrow the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
