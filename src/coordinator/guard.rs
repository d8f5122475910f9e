//! In-progress guard
//!
//! The set of voter ids whose vote is currently being admitted. A voter can
//! hold at most one mark; the mark is an RAII value that clears itself when
//! dropped, so every exit path of an admission task releases it exactly once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct GuardState {
    active: HashSet<u64>,
    peak: usize,
}

#[derive(Debug, Default)]
pub struct InProgressGuard {
    state: Mutex<GuardState>,
}

impl InProgressGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `voter_id` in progress, or `None` if it already is.
    pub fn try_mark(self: &Arc<Self>, voter_id: u64) -> Option<InProgressMark> {
        let mut state = self.lock();
        if !state.active.insert(voter_id) {
            return None;
        }
        state.peak = state.peak.max(state.active.len());
        Some(InProgressMark {
            guard: Arc::clone(self),
            voter_id,
        })
    }

    /// Number of voters currently marked
    pub fn len(&self) -> usize {
        self.lock().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest number of simultaneous marks ever observed
    pub fn peak(&self) -> usize {
        self.lock().peak
    }

    fn release(&self, voter_id: u64) {
        self.lock().active.remove(&voter_id);
    }
}

/// Held for the whole admission of one voter's request.
#[derive(Debug)]
pub struct InProgressMark {
    guard: Arc<InProgressGuard>,
    voter_id: u64,
}

impl InProgressMark {
    pub fn voter_id(&self) -> u64 {
        self.voter_id
    }
}

impl Drop for InProgressMark {
    fn drop(&mut self) {
        self.guard.release(self.voter_id);
    }
}
