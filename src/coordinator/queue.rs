//! Vote admission queue
//!
//! A min-priority queue of pending vote requests keyed by
//! `(logical_timestamp, voter_id, insertion_seq)`: earlier logical timestamp
//! wins, ties go to the lower voter id, remaining ties to insertion order.
//! `insertion_seq` is strictly increasing per queue, which makes the key a
//! total order even when two requests share a timestamp and voter.

use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::oneshot;

use crate::common::Error;

/// Terminal (or pending) state of one vote request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VoteOutcome {
    Pending,
    Committed { voter_id: u64, candidate: String },
    Rejected { reason: String, message: String },
}

impl VoteOutcome {
    pub fn rejected(err: &Error) -> Self {
        VoteOutcome::Rejected {
            reason: err.reason().to_string(),
            message: err.to_string(),
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, VoteOutcome::Committed { .. })
    }

    /// The rejection reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            VoteOutcome::Rejected { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// A submitted vote waiting for admission
#[derive(Debug)]
pub struct VoteRequest {
    pub request_id: u64,
    pub session_id: String,
    pub candidate: String,
    pub logical_timestamp: u64,
    /// Client-reported click time, Unix seconds
    pub click_time: f64,
    pub enqueued_at: Instant,
    pub responder: Option<oneshot::Sender<VoteOutcome>>,
}

#[derive(Debug)]
pub struct QueueEntry {
    pub logical_timestamp: u64,
    pub voter_id: u64,
    pub insertion_seq: u64,
    pub request: VoteRequest,
}

impl QueueEntry {
    fn key(&self) -> (u64, u64, u64) {
        (self.logical_timestamp, self.voter_id, self.insertion_seq)
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Default)]
struct QueueState {
    heap: BinaryHeap<Reverse<QueueEntry>>,
    next_seq: u64,
}

impl QueueState {
    fn push(&mut self, logical_timestamp: u64, voter_id: u64, request: VoteRequest) {
        let insertion_seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(QueueEntry {
            logical_timestamp,
            voter_id,
            insertion_seq,
            request,
        }));
    }
}

#[derive(Default)]
pub struct AdmissionQueue {
    state: Mutex<QueueState>,
}

impl AdmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue with a fresh insertion counter; returns the new queue length.
    pub fn push(&self, logical_timestamp: u64, voter_id: u64, request: VoteRequest) -> usize {
        let mut state = self.lock();
        state.push(logical_timestamp, voter_id, request);
        state.heap.len()
    }

    /// Remove the entry with the smallest key.
    pub fn pop(&self) -> Option<QueueEntry> {
        self.lock().heap.pop().map(|Reverse(entry)| entry)
    }

    /// Put entries back with the same timestamp and voter but fresh counters.
    pub fn requeue(&self, entries: Vec<QueueEntry>) {
        if entries.is_empty() {
            return;
        }
        let mut state = self.lock();
        for entry in entries {
            state.push(entry.logical_timestamp, entry.voter_id, entry.request);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: u64, timestamp: u64) -> VoteRequest {
        VoteRequest {
            request_id: id,
            session_id: format!("session_{}", id),
            candidate: "Candidate A".to_string(),
            logical_timestamp: timestamp,
            click_time: 0.0,
            enqueued_at: Instant::now(),
            responder: None,
        }
    }

    #[test]
    fn test_lower_timestamp_first() {
        let queue = AdmissionQueue::new();
        queue.push(5, 1, request(1, 5));
        queue.push(3, 2, request(2, 3));
        assert_eq!(queue.pop().unwrap().voter_id, 2);
        assert_eq!(queue.pop().unwrap().voter_id, 1);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_ties_broken_by_voter_then_insertion() {
        let queue = AdmissionQueue::new();
        queue.push(7, 9, request(1, 7));
        queue.push(7, 4, request(2, 7));
        queue.push(7, 4, request(3, 7));

        let first = queue.pop().unwrap();
        assert_eq!((first.voter_id, first.request.request_id), (4, 2));
        let second = queue.pop().unwrap();
        assert_eq!((second.voter_id, second.request.request_id), (4, 3));
        assert_eq!(queue.pop().unwrap().voter_id, 9);
    }

    #[test]
    fn test_requeue_gets_fresh_counter() {
        let queue = AdmissionQueue::new();
        queue.push(2, 1, request(1, 2));
        queue.push(2, 1, request(2, 2));

        let first = queue.pop().unwrap();
        let old_seq = first.insertion_seq;
        queue.requeue(vec![first]);
        assert_eq!(queue.len(), 2);

        // The untouched entry now precedes the requeued one.
        assert_eq!(queue.pop().unwrap().request.request_id, 2);
        let again = queue.pop().unwrap();
        assert_eq!(again.request.request_id, 1);
        assert_eq!(again.logical_timestamp, 2);
        assert_eq!(again.request.candidate, "Candidate A");
        assert!(again.insertion_seq > old_seq);
    }

    #[test]
    fn test_push_reports_length() {
        let queue = AdmissionQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.push(1, 1, request(1, 1)), 1);
        assert_eq!(queue.push(1, 2, request(2, 1)), 2);
    }

    #[test]
    fn test_outcome_reason() {
        let outcome = VoteOutcome::rejected(&Error::AlreadyVoted);
        assert_eq!(outcome.reason(), Some("AlreadyVoted"));
        assert!(!outcome.is_committed());
        assert!(VoteOutcome::Committed {
            voter_id: 1,
            candidate: "X".into()
        }
        .is_committed());
    }
}
