//! Error types for the chat server
//!
//! Defines connection-level errors, outbound send errors and command
//! parse errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Application-level errors
///
/// All of these end the connection they occur on. None of them
/// reach other sessions or the hub.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error (fatal)
    #[error("Line codec error: {0}")]
    Codec(#[from] LinesCodecError),

    /// Channel send error (fatal - hub has shut down)
    #[error("Channel send error")]
    ChannelSend,
}

/// Message send errors
///
/// Occurs when writing to a session whose outbound channel cannot
/// take the message. Always swallowed by the hub.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The client is not draining its outbound queue
    #[error("Channel full")]
    Full,
}

/// Command parse errors
///
/// Only `InvalidTimestamp` is reported back to the sender; the hub
/// ignores every other variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A bare `/` with no command name
    #[error("Empty command")]
    Empty,

    /// Leading `/` followed by an unrecognized command name
    #[error("Unknown command: /{0}")]
    UnknownCommand(String),

    /// A recognized command without one of its required arguments
    #[error("Missing <{argument}> for /{command}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    /// `/delay` with a date and time that do not parse
    #[error("Invalid date '{input}', expected format: /delay YYYY-MM-DD HH:MM <message>")]
    InvalidTimestamp { input: String },
}
