//! Election phase flags toggled by the admin surface and read by admission.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::common::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub voting_active: bool,
    /// Unix seconds; votes clicked after this are rejected
    pub deadline: Option<f64>,
    pub results_published: bool,
}

#[derive(Debug, Default)]
pub struct ElectionState {
    phase: Mutex<Phase>,
}

impl ElectionState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Phase {
        *self.lock()
    }

    /// Open voting; clears any previous publication.
    pub fn start(&self) {
        let mut phase = self.lock();
        phase.voting_active = true;
        phase.results_published = false;
    }

    pub fn stop(&self) {
        self.lock().voting_active = false;
    }

    pub fn set_deadline(&self, end_time: f64) {
        self.lock().deadline = Some(end_time);
    }

    /// Fails with `VotingStillActive` while voting is open.
    pub fn publish(&self) -> Result<()> {
        let mut phase = self.lock();
        if phase.voting_active {
            return Err(Error::VotingStillActive);
        }
        phase.results_published = true;
        Ok(())
    }

    /// Admission check: voting open and the client click within the deadline.
    ///
    /// The click time is reported by the client, not measured here.
    pub fn check_admissible(&self, click_time: f64) -> Result<()> {
        let phase = self.lock();
        if !phase.voting_active {
            return Err(Error::VotingNotActive);
        }
        match phase.deadline {
            Some(deadline) if click_time > deadline => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_by_default() {
        let election = ElectionState::new();
        assert!(matches!(
            election.check_admissible(0.0),
            Err(Error::VotingNotActive)
        ));
    }

    #[test]
    fn test_deadline_uses_click_time() {
        let election = ElectionState::new();
        election.start();
        election.set_deadline(100.0);
        assert!(election.check_admissible(99.5).is_ok());
        assert!(election.check_admissible(100.0).is_ok());
        assert!(matches!(
            election.check_admissible(100.1),
            Err(Error::DeadlineExceeded)
        ));
    }

    #[test]
    fn test_publish_gated_on_stop() {
        let election = ElectionState::new();
        election.start();
        assert!(matches!(election.publish(), Err(Error::VotingStillActive)));
        election.stop();
        election.publish().unwrap();
        assert!(election.snapshot().results_published);

        election.start();
        assert!(!election.snapshot().results_published);
    }
}
