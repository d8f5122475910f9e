//! Notification log
//!
//! Bounded, insertion-ordered log of human-readable events (logins, queued
//! votes, commits, admin toggles). When full, the oldest entry is dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// One notification entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

pub struct NotificationLog {
    entries: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl NotificationLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a message, evicting the oldest entry at capacity.
    pub fn push(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("Notification: {}", message);
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(Notification {
            timestamp: Utc::now(),
            message,
        });
    }

    /// Oldest-first copy of the retained entries
    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order() {
        let log = NotificationLog::new(10);
        log.push("first");
        log.push("second");
        let entries = log.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].message, "second");
    }

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let log = NotificationLog::new(3);
        for i in 0..5 {
            log.push(format!("event {}", i));
        }
        let messages: Vec<_> = log.snapshot().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["event 2", "event 3", "event 4"]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let log = NotificationLog::new(0);
        log.push("dropped");
        assert!(log.is_empty());
    }
}
