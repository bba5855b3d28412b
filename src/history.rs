//! Public chat history
//!
//! Append-only log of formatted public lines. New joiners are replayed
//! the tail of it.

use std::collections::VecDeque;

/// Rolling log of public chat lines in chronological order
///
/// Retains at most `capacity` entries; the oldest are evicted first.
#[derive(Debug)]
pub struct PublicLog {
    entries: VecDeque<String>,
    capacity: usize,
}

impl PublicLog {
    /// Create an empty log retaining up to `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a line, evicting the oldest entry when full
    pub fn push(&mut self, line: String) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line);
    }

    /// The last `count` entries, oldest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &str> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
