//! Bounded, append-only trace of human-readable dashboard lines.

use std::{collections::VecDeque, fmt};

use chrono::{DateTime, Local};

pub const EVENT_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Oldest entries are evicted first once the log holds
/// [`EVENT_LOG_CAPACITY`] lines.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
        }
    }

    pub fn append(&mut self, message: impl Into<String>) -> &LogEntry {
        self.append_at(Local::now(), message)
    }

    pub fn append_at(&mut self, timestamp: DateTime<Local>, message: impl Into<String>) -> &LogEntry {
        self.entries.push_back(LogEntry {
            timestamp,
            message: message.into(),
        });
        while self.entries.len() > EVENT_LOG_CAPACITY {
            self.entries.pop_front();
        }
        // Just pushed, so never empty.
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}
