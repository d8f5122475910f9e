//! Replica state
//!
//! A follower's copy of the voter roster and election flags. Records are
//! applied in arrival order with overwrite semantics, so a record delivered
//! twice leaves the same state as one delivered once.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::common::ReplicationRecord;
use crate::coordinator::election::Phase;
use crate::coordinator::registry::Voter;

#[derive(Debug, Default)]
struct ReplicaState {
    voters: Vec<Voter>,
    phase: Phase,
    applied: u64,
}

#[derive(Debug, Default)]
pub struct ReplicaStore {
    state: Mutex<ReplicaState>,
}

impl ReplicaStore {
    /// Seed with the same roster the coordinator starts with (ids 1..=n).
    pub fn new(roster: &[String]) -> Self {
        let voters = roster
            .iter()
            .enumerate()
            .map(|(i, name)| Voter::new(i as u64 + 1, name.clone()))
            .collect();
        Self {
            state: Mutex::new(ReplicaState {
                voters,
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReplicaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one record. Always acknowledges: a vote for an id this replica
    /// does not know is logged and skipped.
    pub fn apply(&self, record: &ReplicationRecord) -> bool {
        let mut state = self.lock();
        match record {
            ReplicationRecord::Vote {
                voter_id,
                candidate,
                timestamp,
            } => match state.voters.iter_mut().find(|v| v.id == *voter_id) {
                Some(voter) => {
                    voter.has_voted = true;
                    voter.chosen_candidate = Some(candidate.clone());
                    tracing::info!(
                        "Replicated vote: voter {} -> {} (ts={})",
                        voter_id,
                        candidate,
                        timestamp
                    );
                }
                None => tracing::warn!("Vote for unknown voter {} ignored", voter_id),
            },
            ReplicationRecord::Register { id, name } => {
                if !state.voters.iter().any(|v| v.id == *id) {
                    state.voters.push(Voter::new(*id, name.clone()));
                    tracing::info!("Replicated registration: {} (ID: {})", name, id);
                }
            }
            ReplicationRecord::SetDeadline { end_time } => {
                state.phase.deadline = Some(*end_time);
            }
            ReplicationRecord::StartVoting {} => {
                state.phase.voting_active = true;
                state.phase.results_published = false;
            }
            ReplicationRecord::StopVoting {} => {
                state.phase.voting_active = false;
            }
            ReplicationRecord::PublishResults {} => {
                state.phase.results_published = true;
            }
        }
        state.applied += 1;
        true
    }

    pub fn voters(&self) -> Vec<Voter> {
        self.lock().voters.clone()
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Number of records applied since startup
    pub fn applied(&self) -> u64 {
        self.lock().applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ReplicaStore {
        ReplicaStore::new(&["Alice".to_string(), "Bob".to_string()])
    }

    #[test]
    fn test_vote_is_idempotent() {
        let store = store();
        let record = ReplicationRecord::Vote {
            voter_id: 2,
            candidate: "Candidate C".into(),
            timestamp: 9,
        };
        assert!(store.apply(&record));
        assert!(store.apply(&record));

        let bob = &store.voters()[1];
        assert!(bob.has_voted);
        assert_eq!(bob.chosen_candidate.as_deref(), Some("Candidate C"));
        assert_eq!(store.applied(), 2);
    }

    #[test]
    fn test_unknown_voter_acknowledged() {
        let store = store();
        assert!(store.apply(&ReplicationRecord::Vote {
            voter_id: 42,
            candidate: "Candidate A".into(),
            timestamp: 1,
        }));
        assert!(store.voters().iter().all(|v| !v.has_voted));
    }

    #[test]
    fn test_register_once() {
        let store = store();
        let record = ReplicationRecord::Register {
            id: 3,
            name: "Carol".into(),
        };
        store.apply(&record);
        store.apply(&record);
        assert_eq!(store.voters().len(), 3);
    }

    #[test]
    fn test_phase_flags() {
        let store = store();
        store.apply(&ReplicationRecord::SetDeadline { end_time: 50.0 });
        store.apply(&ReplicationRecord::StartVoting {});
        assert!(store.phase().voting_active);
        store.apply(&ReplicationRecord::StopVoting {});
        store.apply(&ReplicationRecord::PublishResults {});

        let phase = store.phase();
        assert!(!phase.voting_active);
        assert!(phase.results_published);
        assert_eq!(phase.deadline, Some(50.0));
    }
}
