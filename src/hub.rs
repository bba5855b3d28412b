//! ChatHub Actor implementation
//!
//! The central actor that owns all chat state: sessions, the public
//! nickname registry, the public log and pending timers. Connection
//! handlers talk to it only through [`HubCommand`]s, and fired timers
//! come back through the same loop, so every state change is
//! serialized without locks.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::command::{self, Command};
use crate::config::HubConfig;
use crate::error::ParseError;
use crate::history::PublicLog;
use crate::message;
use crate::scheduler::{self, Clock, Scheduler, SystemClock};
use crate::session::Session;
use crate::types::SessionId;

/// Commands sent from connection handlers to the ChatHub actor
#[derive(Debug)]
pub enum HubCommand {
    /// New connection accepted
    Connect {
        session_id: SessionId,
        sender: mpsc::Sender<String>,
    },
    /// One inbound line
    Line { session_id: SessionId, line: String },
    /// Connection closed or failed
    Disconnect { session_id: SessionId },
}

/// Work the hub schedules for later
#[derive(Debug)]
pub enum TimedAction {
    /// Reset a muted session's report count
    Unban { session_id: SessionId },
    /// Broadcast a `/delay` message on behalf of `origin`
    DelayedBroadcast { origin: SessionId, body: String },
}

/// Last known state of a disconnected session with delayed broadcasts
/// still pending
#[derive(Debug)]
struct Departed {
    nickname: String,
    is_public: bool,
    pending_delays: u32,
}

/// The main ChatHub actor
pub struct ChatHub {
    config: HubConfig,
    /// All connected sessions: SessionId -> Session
    sessions: HashMap<SessionId, Session>,
    /// Public chat members by nickname, last join wins
    registry: HashMap<String, SessionId>,
    /// Disconnected senders of pending delayed broadcasts
    departed: HashMap<SessionId, Departed>,
    log: PublicLog,
    scheduler: Scheduler<TimedAction>,
    clock: Arc<dyn Clock>,
    /// Command receiver channel
    receiver: mpsc::Receiver<HubCommand>,
}

impl ChatHub {
    /// Create a new ChatHub with the given command receiver
    pub fn new(config: HubConfig, receiver: mpsc::Receiver<HubCommand>) -> Self {
        Self::with_clock(config, receiver, Arc::new(SystemClock))
    }

    /// Create a ChatHub that reads wall-clock time from `clock`
    pub fn with_clock(
        config: HubConfig,
        receiver: mpsc::Receiver<HubCommand>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            log: PublicLog::new(config.log_capacity),
            config,
            sessions: HashMap::new(),
            registry: HashMap::new(),
            departed: HashMap::new(),
            scheduler: Scheduler::new(),
            clock,
            receiver,
        }
    }

    /// Run the ChatHub event loop
    ///
    /// Processes commands and fired timers until all command senders are
    /// dropped. Pending timers are cancelled on the way out.
    pub async fn run(mut self) {
        info!("ChatHub started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                action = self.scheduler.next_fired() => self.handle_timer(action),
            }
        }

        info!(
            "ChatHub shutting down, cancelling {} pending timers",
            self.scheduler.pending()
        );
        self.scheduler.cancel_all();
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Connect { session_id, sender } => {
                self.handle_connect(session_id, sender);
            }
            HubCommand::Line { session_id, line } => {
                self.handle_line(session_id, &line);
            }
            HubCommand::Disconnect { session_id } => {
                self.handle_disconnect(session_id);
            }
        }
    }

    /// Execute a fired timer
    fn handle_timer(&mut self, action: TimedAction) {
        match action {
            TimedAction::Unban { session_id } => self.unban(session_id),
            TimedAction::DelayedBroadcast { origin, body } => {
                if let Some(session) = self.sessions.get_mut(&origin) {
                    session.pending_delays = session.pending_delays.saturating_sub(1);
                    self.broadcast_public(origin, &body);
                } else {
                    self.broadcast_departed(origin, &body);
                }
            }
        }
    }

    /// Broadcast a delayed message whose sender has disconnected,
    /// under the sender's state at disconnect time
    fn broadcast_departed(&mut self, origin: SessionId, body: &str) {
        let Some(departed) = self.departed.get_mut(&origin) else {
            return;
        };

        departed.pending_delays = departed.pending_delays.saturating_sub(1);
        let nickname = departed.nickname.clone();
        let is_public = departed.is_public;
        if departed.pending_delays == 0 {
            self.departed.remove(&origin);
        }

        if is_public {
            debug!("Delayed broadcast from departed session {}", origin);
            self.publish(&nickname, body);
        } else {
            debug!("Dropping delayed message from departed non-public session {}", origin);
        }
    }

    fn handle_connect(&mut self, session_id: SessionId, sender: mpsc::Sender<String>) {
        info!("Session {} connected", session_id);
        self.sessions
            .insert(session_id, Session::new(session_id, sender));
        debug!(
            "Total sessions: {}, public members: {}",
            self.sessions.len(),
            self.registry.len()
        );
    }

    fn handle_disconnect(&mut self, session_id: SessionId) {
        let Some(session) = self.sessions.remove(&session_id) else {
            return;
        };
        // Only keys still pointing at this session; a later joiner may own the nickname now
        self.registry.retain(|_, id| *id != session_id);

        if session.pending_delays > 0 {
            self.departed.insert(
                session_id,
                Departed {
                    nickname: session.nickname.clone(),
                    is_public: session.is_public,
                    pending_delays: session.pending_delays,
                },
            );
        }

        info!("Session {} ('{}') disconnected", session_id, session.nickname);
        debug!(
            "Total sessions: {}, public members: {}",
            self.sessions.len(),
            self.registry.len()
        );
    }

    /// Parse and dispatch one inbound line
    fn handle_line(&mut self, session_id: SessionId, line: &str) {
        let Some(session) = self.sessions.get(&session_id) else {
            return;
        };

        if session.is_banned(self.config.reports_for_ban) {
            debug!("Dropping line from muted session {}", session_id);
            return;
        }

        match command::parse(line) {
            Command::PublicJoin => self.join_public(session_id),
            Command::PlainText { body } => self.broadcast_public(session_id, &body),
            Command::SetNickname { nick } => self.set_nickname(session_id, nick),
            Command::PrivateMessage { target, body } => {
                self.private_message(session_id, &target, &body)
            }
            Command::Report { target } => self.report(&target),
            Command::Delay { when, body } => self.delay(session_id, when, body),
            Command::Unknown(err @ ParseError::InvalidTimestamp { .. }) => {
                deliver(session, err.to_string());
            }
            Command::Unknown(err) => {
                debug!("Ignoring command from {}: {}", session_id, err);
            }
        }
    }

    /// Join public chat and replay recent history
    fn join_public(&mut self, session_id: SessionId) {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return;
        };

        if session.is_public {
            debug!("Session {} is already in public chat", session_id);
            return;
        }

        session.is_public = true;
        if let Some(previous) = self.registry.insert(session.nickname.clone(), session_id) {
            if previous != session_id {
                info!(
                    "Nickname '{}' taken over by {} from {}",
                    session.nickname, session_id, previous
                );
            }
        }

        info!("Session {} joined public chat as '{}'", session_id, session.nickname);

        for line in self.log.recent(self.config.history_len) {
            deliver(session, line);
        }
    }

    /// Broadcast plain text from a public session
    fn broadcast_public(&mut self, session_id: SessionId, text: &str) {
        let Some(session) = self.sessions.get(&session_id) else {
            return;
        };

        if !session.is_public {
            debug!("Dropping text from {} outside public chat", session_id);
            return;
        }

        let nickname = session.nickname.clone();
        self.publish(&nickname, text);
    }

    /// Append to the public log and fan out to every registered member
    fn publish(&mut self, nickname: &str, text: &str) {
        let line = message::chat_line(nickname, text);
        self.log.push(line.clone());

        for id in self.registry.values() {
            if let Some(member) = self.sessions.get(id) {
                deliver(member, line.as_str());
            }
        }
    }

    /// Rename a session
    ///
    /// The registry key of an already public session is left as it was.
    fn set_nickname(&mut self, session_id: SessionId, nick: String) {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return;
        };

        info!("Session {} renamed '{}' -> '{}'", session_id, session.nickname, nick);
        session.nickname = nick;
    }

    fn private_message(&mut self, session_id: SessionId, target: &str, body: &str) {
        let Some(sender) = self.sessions.get(&session_id) else {
            return;
        };

        let Some(recipient) = self
            .registry
            .get(target)
            .and_then(|id| self.sessions.get(id))
        else {
            debug!("Private message to unknown nickname '{}' dropped", target);
            return;
        };

        deliver(recipient, message::chat_line(&sender.nickname, body));
    }

    /// Count a report against a public nickname, muting at the threshold
    fn report(&mut self, target: &str) {
        let Some(session) = self
            .registry
            .get(target)
            .and_then(|id| self.sessions.get_mut(id))
        else {
            debug!("Report for unknown nickname '{}' dropped", target);
            return;
        };

        session.report_count = session.report_count.saturating_add(1);
        debug!("'{}' has {} reports", target, session.report_count);

        if session.is_banned(self.config.reports_for_ban) && session.unban_timer.is_none() {
            let handle = self.scheduler.schedule(
                self.config.ban_time(),
                TimedAction::Unban {
                    session_id: session.id,
                },
            );
            session.unban_timer = Some(handle);
            info!(
                "'{}' ({}) muted for {}s",
                target, session.id, self.config.ban_time_secs
            );
        }
    }

    fn unban(&mut self, session_id: SessionId) {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            debug!("Unban for departed session {}", session_id);
            return;
        };

        session.report_count = 0;
        session.unban_timer = None;
        info!("'{}' ({}) unmuted", session.nickname, session_id);
    }

    /// Schedule a public broadcast at an absolute UTC time
    fn delay(&mut self, session_id: SessionId, when: DateTime<Utc>, body: String) {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return;
        };

        session.pending_delays += 1;
        let wait = scheduler::delay_until(self.clock.now(), when);
        let action = TimedAction::DelayedBroadcast {
            origin: session_id,
            body,
        };
        let handle = self.scheduler.schedule(wait, action);

        info!(
            "Session {} scheduled a message for {} ({})",
            session_id,
            when,
            handle.id()
        );
    }
}

/// Queue a line for a session, swallowing failures
fn deliver(session: &Session, line: impl Into<String>) {
    if let Err(e) = session.send(line) {
        warn!("Dropped message for {}: {}", session.id, e);
    }
}
