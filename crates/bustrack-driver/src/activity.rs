//! Bounded activity log shown to the driver.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// Entries kept by default.
pub const DEFAULT_CAPACITY: usize = 20;

/// Severity of an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    /// Normal progress.
    Info,
    /// Something went wrong.
    Error,
}

/// One line of the activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    /// When it was recorded.
    pub at: DateTime<Utc>,
    /// Severity.
    pub kind: ActivityKind,
    /// Human-readable text.
    pub message: String,
}

/// Ring buffer of recent activity, newest first.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ActivityLog {
    /// Log holding at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an entry, evicting the oldest once full.
    pub fn push(&mut self, kind: ActivityKind, message: impl Into<String>) {
        self.entries.push_front(ActivityEntry {
            at: Utc::now(),
            kind,
            message: message.into(),
        });
        self.entries.truncate(self.capacity);
    }

    /// Record an [`ActivityKind::Info`] entry.
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ActivityKind::Info, message);
    }

    /// Record an [`ActivityKind::Error`] entry.
    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ActivityKind::Error, message);
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries held.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn newest_entry_comes_first() {
        let mut log = ActivityLog::default();
        log.info("connected");
        log.error("no fix");
        let kinds: Vec<ActivityKind> = log.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, [ActivityKind::Error, ActivityKind::Info]);
        assert_eq!(log.iter().next().unwrap().message, "no fix");
    }

    #[test]
    fn bounded_at_capacity() {
        let mut log = ActivityLog::default();
        for i in 0..45 {
            log.info(format!("position {i}"));
        }
        assert_eq!(log.len(), DEFAULT_CAPACITY);
        assert_eq!(log.iter().next().unwrap().message, "position 44");
        assert_eq!(log.iter().last().unwrap().message, "position 25");
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut log = ActivityLog::with_capacity(0);
        log.info("a");
        log.info("b");
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.iter().next().unwrap().message, "b");
    }
}
