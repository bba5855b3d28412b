//! Line-based TCP Chat Server Library
//!
//! A small text chat protocol over TCP built with tokio, using the Actor
//! pattern for state management.
//!
//! # Features
//! - Plain UTF-8 lines over TCP, one message per line
//! - Self-declared nicknames (`/nickname`)
//! - Public chat with history replay on join (`/public`)
//! - Private messages (`/pm`)
//! - Delayed public messages at an absolute UTC time (`/delay`)
//! - Abuse reports with a temporary mute (`/ban`)
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatHub` is the central actor owning sessions, the public log and
//!   pending timers
//! - Each connection has a `handler` task communicating with the hub
//! - Timers fire back into the hub's own loop, so no locks are needed
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use chat_hub::{accept_loop, ChatHub, HubConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8000").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(ChatHub::new(HubConfig::default(), cmd_rx).run());
//!     accept_loop(listener, cmd_tx, 1024).await;
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod handler;
pub mod history;
pub mod hub;
pub mod message;
pub mod scheduler;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use command::{parse, Command};
pub use config::{HubConfig, ServerConfig};
pub use error::{AppError, ParseError, SendError};
pub use handler::{accept_loop, handle_connection};
pub use history::PublicLog;
pub use hub::{ChatHub, HubCommand, TimedAction};
pub use scheduler::{Clock, Scheduler, SystemClock, TimerHandle};
pub use session::Session;
pub use types::{SessionId, TimerId};
