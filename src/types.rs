//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `SessionId`: UUID-based unique session identifier
//! - `TimerId`: sequential identifier for scheduled actions

use uuid::Uuid;

/// Unique session identifier (newtype pattern)
///
/// Wraps a UUID v4. Nicknames are self-declared and may collide,
/// so the hub keys its sessions by this id instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one scheduled action, unique per scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}
