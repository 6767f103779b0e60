//! Capped, ordered record of link activity.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::types::{Direction, EntrySeq, Outcome};

/// One immutable line of link activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntry {
    /// Position in append order, starting at 1.
    pub seq: EntrySeq,
    /// Producer of the entry.
    pub direction: Direction,
    /// Payload text or notice.
    pub text: String,
    /// How the operation ended.
    pub outcome: Outcome,
}

#[derive(Debug)]
struct LogInner {
    entries: VecDeque<MessageEntry>,
    next_seq: EntrySeq,
    dropped: u64,
}

/// Bounded, append-only record of sent, received and system messages.
///
/// Safe for concurrent appenders. Sequence numbers are assigned under the
/// same lock that inserts the entry, so `seq` order is append order.
#[derive(Debug)]
pub struct MessageLog {
    inner: Mutex<LogInner>,
    capacity: usize,
}

impl MessageLog {
    /// Log that keeps at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(LogInner {
                entries: VecDeque::with_capacity(capacity.min(1024)),
                next_seq: 1,
                dropped: 0,
            }),
            capacity,
        }
    }

    /// Appends one entry and returns it with its assigned `seq`.
    pub fn append(&self, direction: Direction, text: impl Into<String>, outcome: Outcome) -> MessageEntry {
        self.append_with(direction, text, outcome, |_| {})
    }

    /// Appends and runs `notify` on the new entry before any other append
    /// can land, so observers see entries in `seq` order.
    pub fn append_with<F>(
        &self,
        direction: Direction,
        text: impl Into<String>,
        outcome: Outcome,
        notify: F,
    ) -> MessageEntry
    where
        F: FnOnce(&MessageEntry),
    {
        let mut inner = self.lock();
        let entry = MessageEntry {
            seq: inner.next_seq,
            direction,
            text: text.into(),
            outcome,
        };
        inner.next_seq += 1;
        if inner.entries.len() == self.capacity {
            inner.entries.pop_front();
            inner.dropped += 1;
        }
        inner.entries.push_back(entry.clone());
        notify(&entry);
        entry
    }

    /// All retained entries, oldest first.
    pub fn snapshot(&self) -> Vec<MessageEntry> {
        self.lock().entries.iter().cloned().collect()
    }

    /// The newest `n` retained entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<MessageEntry> {
        let inner = self.lock();
        let start = inner.entries.len().saturating_sub(n);
        inner.entries.iter().skip(start).cloned().collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// True when nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Entries discarded to stay within capacity.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    /// Maximum number of retained entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
