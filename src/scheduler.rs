//! Delayed actions
//!
//! [`Scheduler`] runs "do this after that long" entries on their own
//! tokio tasks and hands each action back to its owner through
//! [`Scheduler::next_fired`] when the delay elapses. The owner executes
//! the action itself, so fired actions are serialized with everything
//! else the owner does.
//!
//! Time is `tokio::time`, which tests pause and advance. [`Clock`]
//! covers the wall-clock side: turning an absolute UTC time into a delay.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::types::TimerId;

/// Buffer for actions that fired but have not been collected yet
const FIRED_BUFFER_SIZE: usize = 64;

/// Source of the current UTC time
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Delay from `now` until `when`, zero if `when` already passed
pub fn delay_until(now: DateTime<Utc>, when: DateTime<Utc>) -> Duration {
    (when - now).to_std().unwrap_or(Duration::ZERO)
}

/// Cancellation handle for one scheduled action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    id: TimerId,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }
}

/// Runs each scheduled action exactly once, unless cancelled first
#[derive(Debug)]
pub struct Scheduler<A> {
    next_id: u64,
    /// Entries that have been neither collected nor cancelled
    timers: HashMap<TimerId, AbortHandle>,
    fired_tx: mpsc::Sender<(TimerId, A)>,
    fired_rx: mpsc::Receiver<(TimerId, A)>,
}

impl<A: Send + 'static> Scheduler<A> {
    pub fn new() -> Self {
        let (fired_tx, fired_rx) = mpsc::channel(FIRED_BUFFER_SIZE);
        Self {
            next_id: 0,
            timers: HashMap::new(),
            fired_tx,
            fired_rx,
        }
    }

    /// Arm `action` to fire after `delay`.
    ///
    /// Never blocks the caller; a zero delay fires on the next turn of
    /// the runtime.
    pub fn schedule(&mut self, delay: Duration, action: A) -> TimerHandle {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        let fired_tx = self.fired_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver lives as long as the scheduler
            let _ = fired_tx.send((id, action)).await;
        });
        self.timers.insert(id, task.abort_handle());

        debug!("Scheduled {} in {:?}", id, delay);
        TimerHandle { id }
    }

    /// Cancel a pending action.
    ///
    /// Returns false if it was already collected or cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.timers.remove(&handle.id) {
            Some(task) => {
                task.abort();
                debug!("Cancelled {}", handle.id);
                true
            }
            None => false,
        }
    }

    /// Cancel every pending action
    pub fn cancel_all(&mut self) {
        for (_, task) in self.timers.drain() {
            task.abort();
        }
    }

    /// Number of actions armed but not yet collected
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Wait for the next due action.
    ///
    /// Cancel safe. Pends forever while nothing is scheduled.
    pub async fn next_fired(&mut self) -> A {
        loop {
            let Some((id, action)) = self.fired_rx.recv().await else {
                // Unreachable while `fired_tx` is held by self
                return std::future::pending().await;
            };
            // Cancelled after its task already fired
            if self.timers.remove(&id).is_some() {
                return action;
            }
        }
    }
}

impl<A: Send + 'static> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Drop for Scheduler<A> {
    fn drop(&mut self) {
        for (_, task) in self.timers.drain() {
            task.abort();
        }
    }
}
