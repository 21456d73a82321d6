//! Append-only action log

use crate::state_machine::Action;
use chrono::{DateTime, Utc};

/// One appended action with its position and cause
#[derive(Debug, Clone)]
pub struct LoggedAction {
    pub seq: u64,
    /// Sequence number of the action whose handler emitted this one
    pub caused_by: Option<u64>,
    pub at: DateTime<Utc>,
    pub action: Action,
}

impl LoggedAction {
    pub fn kind(&self) -> &'static str {
        self.action.kind()
    }
}

/// Ordered record of every action reduced in a session.
///
/// Sequence numbers start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct ActionLog {
    entries: Vec<LoggedAction>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, action: Action, caused_by: Option<u64>) -> &LoggedAction {
        let seq = self.next_seq();
        self.entries.push(LoggedAction {
            seq,
            caused_by,
            at: Utc::now(),
            action,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn next_seq(&self) -> u64 {
        self.entries.last().map_or(1, |e| e.seq + 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LoggedAction] {
        &self.entries
    }

    /// Entries after `seq`, in order
    pub fn since(&self, seq: u64) -> &[LoggedAction] {
        let start = self.entries.partition_point(|e| e.seq <= seq);
        &self.entries[start..]
    }

    /// Actions emitted, directly or transitively, because of `seq`
    pub fn descendants(&self, seq: u64) -> Vec<&LoggedAction> {
        let mut roots = vec![seq];
        let mut found = Vec::new();
        for entry in self.since(seq) {
            if entry.caused_by.is_some_and(|parent| roots.contains(&parent)) {
                roots.push(entry.seq);
                found.push(entry);
            }
        }
        found
    }
}
