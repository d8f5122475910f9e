//! Voter registry
//!
//! The authoritative voter table. Every read and write goes through a single
//! mutex so the `has_voted` check-then-set in [`VoterRegistry::commit_vote`]
//! is atomic with respect to concurrent admissions.
//!
//! Invariant: `has_voted == true` implies `chosen_candidate` is one of the
//! registry's candidates. Vote processing never clears a committed ballot
//! except through [`VoterRegistry::rollback_vote`] after failed replication.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::common::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub id: u64,
    pub name: String,
    pub has_voted: bool,
    pub chosen_candidate: Option<String>,
}

impl Voter {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            has_voted: false,
            chosen_candidate: None,
        }
    }
}

/// Result of [`VoterRegistry::prepare_registration`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// A voter with this name already exists.
    Existing(u64),
    /// The record a new registration would insert. Nothing is stored until
    /// [`VoterRegistry::insert`] is called with it.
    Created(Voter),
}

pub struct VoterRegistry {
    voters: Mutex<Vec<Voter>>,
    candidates: Vec<String>,
}

impl VoterRegistry {
    /// Build a registry seeded with `roster`, assigning ids 1..=n in order.
    pub fn new(roster: &[String], candidates: Vec<String>) -> Self {
        let voters = roster
            .iter()
            .enumerate()
            .map(|(i, name)| Voter::new(i as u64 + 1, name.clone()))
            .collect();
        Self {
            voters: Mutex::new(voters),
            candidates,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Voter>> {
        self.voters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn is_candidate(&self, candidate: &str) -> bool {
        self.candidates.iter().any(|c| c == candidate)
    }

    /// Idempotent by name: an existing voter's id is returned unchanged,
    /// otherwise the record with the next sequential id is built but not
    /// stored. Callers must serialize prepare and insert so ids stay unique.
    pub fn prepare_registration(&self, name: &str) -> Registration {
        let voters = self.lock();
        if let Some(existing) = voters.iter().find(|v| v.name == name) {
            return Registration::Existing(existing.id);
        }
        let id = voters.iter().map(|v| v.id).max().unwrap_or(0) + 1;
        Registration::Created(Voter::new(id, name))
    }

    /// Store a prepared voter once its registration has been replicated.
    /// Returns the id now held by that name.
    pub fn insert(&self, voter: Voter) -> u64 {
        let mut voters = self.lock();
        if let Some(existing) = voters.iter().find(|v| v.name == voter.name) {
            return existing.id;
        }
        let id = voter.id;
        voters.push(voter);
        id
    }

    /// Both id and name must match the same record.
    pub fn find_by_identity(&self, voter_id: u64, name: &str) -> Result<Voter> {
        self.lock()
            .iter()
            .find(|v| v.id == voter_id && v.name == name)
            .cloned()
            .ok_or(Error::VoterNotFound)
    }

    /// `Some(has_voted)` for a known id.
    pub fn has_voted(&self, voter_id: u64) -> Option<bool> {
        self.lock()
            .iter()
            .find(|v| v.id == voter_id)
            .map(|v| v.has_voted)
    }

    /// Locate the voter by id and name and record the ballot, all under one
    /// lock acquisition.
    pub fn commit_vote(&self, voter_id: u64, name: &str, candidate: &str) -> Result<Voter> {
        if !self.is_candidate(candidate) {
            return Err(Error::InvalidCandidate(candidate.to_string()));
        }
        let mut voters = self.lock();
        let voter = voters
            .iter_mut()
            .find(|v| v.id == voter_id && v.name == name)
            .ok_or(Error::VoterNotFound)?;
        if voter.has_voted {
            return Err(Error::AlreadyVoted);
        }
        voter.has_voted = true;
        voter.chosen_candidate = Some(candidate.to_string());
        Ok(voter.clone())
    }

    /// Clear a ballot committed by the caller whose replication failed.
    pub fn rollback_vote(&self, voter_id: u64) -> Result<()> {
        let mut voters = self.lock();
        let voter = voters
            .iter_mut()
            .find(|v| v.id == voter_id)
            .ok_or(Error::VoterNotFound)?;
        voter.has_voted = false;
        voter.chosen_candidate = None;
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<Voter> {
        self.lock().clone()
    }

    /// Committed ballots per candidate, in candidate order, zeros included.
    pub fn tally(&self) -> Vec<(String, u64)> {
        let voters = self.lock();
        self.candidates
            .iter()
            .map(|c| {
                let count = voters
                    .iter()
                    .filter(|v| v.has_voted && v.chosen_candidate.as_deref() == Some(c.as_str()))
                    .count() as u64;
                (c.clone(), count)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> VoterRegistry {
        VoterRegistry::new(
            &["Alice".to_string(), "Bob".to_string()],
            vec!["Yes".to_string(), "No".to_string()],
        )
    }

    #[test]
    fn test_seeded_ids() {
        let reg = registry();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.find_by_identity(1, "Alice").unwrap().id, 1);
        assert_eq!(reg.find_by_identity(2, "Bob").unwrap().id, 2);
    }

    #[test]
    fn test_register_is_idempotent_by_name() {
        let reg = registry();
        assert_eq!(reg.prepare_registration("Alice"), Registration::Existing(1));
        assert_eq!(reg.len(), 2);

        let Registration::Created(v) = reg.prepare_registration("Carol") else {
            panic!("expected new voter");
        };
        assert_eq!(v.id, 3);
        assert!(!v.has_voted);
        assert_eq!(reg.insert(v), 3);
        assert_eq!(reg.prepare_registration("Carol"), Registration::Existing(3));
    }

    #[test]
    fn test_prepared_voter_invisible_until_inserted() {
        let reg = registry();
        let Registration::Created(v) = reg.prepare_registration("Dave") else {
            panic!("expected new voter");
        };
        assert_eq!(reg.len(), 2);
        assert!(reg.find_by_identity(v.id, "Dave").is_err());
        assert!(matches!(reg.prepare_registration("Dave"), Registration::Created(_)));

        reg.insert(v);
        assert_eq!(reg.find_by_identity(3, "Dave").unwrap().name, "Dave");
    }

    #[test]
    fn test_find_requires_both_fields() {
        let reg = registry();
        assert!(matches!(reg.find_by_identity(1, "Bob"), Err(Error::VoterNotFound)));
        assert!(matches!(reg.find_by_identity(7, "Alice"), Err(Error::VoterNotFound)));
    }

    #[test]
    fn test_commit_then_already_voted() {
        let reg = registry();
        let v = reg.commit_vote(1, "Alice", "Yes").unwrap();
        assert!(v.has_voted);
        assert_eq!(v.chosen_candidate.as_deref(), Some("Yes"));
        assert!(matches!(reg.commit_vote(1, "Alice", "No"), Err(Error::AlreadyVoted)));
        assert_eq!(
            reg.find_by_identity(1, "Alice").unwrap().chosen_candidate.as_deref(),
            Some("Yes")
        );
    }

    #[test]
    fn test_commit_rejects_unknown_candidate_and_voter() {
        let reg = registry();
        assert!(matches!(
            reg.commit_vote(1, "Alice", "Maybe"),
            Err(Error::InvalidCandidate(_))
        ));
        assert!(matches!(reg.commit_vote(9, "Zed", "Yes"), Err(Error::VoterNotFound)));
        assert_eq!(reg.has_voted(1), Some(false));
    }

    #[test]
    fn test_rollback_allows_revote() {
        let reg = registry();
        reg.commit_vote(2, "Bob", "No").unwrap();
        reg.rollback_vote(2).unwrap();
        let bob = reg.find_by_identity(2, "Bob").unwrap();
        assert!(!bob.has_voted);
        assert!(bob.chosen_candidate.is_none());
        assert!(reg.commit_vote(2, "Bob", "Yes").is_ok());
    }

    #[test]
    fn test_tally() {
        let reg = registry();
        reg.commit_vote(1, "Alice", "No").unwrap();
        reg.commit_vote(2, "Bob", "No").unwrap();
        assert_eq!(
            reg.tally(),
            vec![("Yes".to_string(), 0), ("No".to_string(), 2)]
        );
    }
}
