// Output log: the short, user-facing text history (command confirmations,
// server output, connection problems).

use std::collections::VecDeque;

use chrono::{DateTime, Local};

use crate::error::{EngineError, ErrorKind};

pub const DEFAULT_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// A command was handed to the socket.
    CommandSent,
    /// `success` frame from the host.
    Success,
    Error(ErrorKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputEntry {
    pub at: DateTime<Local>,
    pub kind: OutputKind,
    pub text: String,
}

impl OutputEntry {
    pub fn is_error(&self) -> bool {
        matches!(self.kind, OutputKind::Error(_))
    }
}

/// Bounded history; the oldest entry is evicted first.
#[derive(Debug)]
pub struct OutputLog {
    entries: VecDeque<OutputEntry>,
    capacity: usize,
}

impl Default for OutputLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY)
    }
}

impl OutputLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        OutputLog {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, kind: OutputKind, text: impl Into<String>) -> &OutputEntry {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(OutputEntry {
            at: Local::now(),
            kind,
            text: text.into(),
        });
        // Just pushed, so the deque is non-empty.
        &self.entries[self.entries.len() - 1]
    }

    pub fn push_error(&mut self, error: &EngineError) -> &OutputEntry {
        self.push(OutputKind::Error(error.kind()), error.to_string())
    }

    pub fn latest(&self) -> Option<&OutputEntry> {
        self.entries.back()
    }

    pub fn entries(&self) -> impl Iterator<Item = &OutputEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_newest_entries() {
        let mut log = OutputLog::with_capacity(2);
        log.push(OutputKind::Success, "one");
        log.push(OutputKind::Success, "two");
        log.push(OutputKind::Success, "three");

        let texts: Vec<_> = log.entries().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["two", "three"]);
        assert_eq!(log.latest().unwrap().text, "three");
    }

    #[test]
    fn zero_capacity_still_holds_latest() {
        let mut log = OutputLog::with_capacity(0);
        log.push(OutputKind::Success, "a");
        log.push(OutputKind::Success, "b");
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().unwrap().text, "b");
    }

    #[test]
    fn errors_are_classified() {
        let mut log = OutputLog::default();
        let entry = log.push_error(&EngineError::NotConnected);
        assert_eq!(entry.kind, OutputKind::Error(ErrorKind::NotConnected));
        assert_eq!(entry.text, "Not connected. Please connect first.");
        assert!(entry.is_error());
    }
}
