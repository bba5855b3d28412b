//! Session struct definition
//!
//! Represents one connected client with its chat state and outbound
//! channel.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::scheduler::TimerHandle;
use crate::types::SessionId;

/// Nickname every session starts with
pub const DEFAULT_NICKNAME: &str = "User";

/// Connected session
///
/// Owned by the hub. Created on connect, dropped on disconnect.
#[derive(Debug)]
pub struct Session {
    /// Unique identifier for this session
    pub id: SessionId,
    /// Self-declared nickname
    pub nickname: String,
    /// Reports received since the last unban
    pub report_count: u32,
    /// Joined public chat
    pub is_public: bool,
    /// Server → client line channel
    pub sender: mpsc::Sender<String>,
    /// Pending unban, armed when the report threshold is crossed
    pub unban_timer: Option<TimerHandle>,
    /// Delayed broadcasts scheduled but not yet fired
    pub pending_delays: u32,
}

impl Session {
    /// Create a new anonymous session with the given ID and sender channel
    pub fn new(id: SessionId, sender: mpsc::Sender<String>) -> Self {
        Self {
            id,
            nickname: DEFAULT_NICKNAME.to_string(),
            report_count: 0,
            is_public: false,
            sender,
            unban_timer: None,
            pending_delays: 0,
        }
    }

    /// Queue a line for this session without waiting.
    ///
    /// Fails if the client has gone away or is not reading.
    pub fn send(&self, line: impl Into<String>) -> Result<(), SendError> {
        self.sender.try_send(line.into()).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Whether this session is muted by reports
    pub fn is_banned(&self, reports_for_ban: u32) -> bool {
        self.report_count >= reports_for_ban
    }
}
