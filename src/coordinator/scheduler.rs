//! Vote scheduler
//!
//! A single background task drains the admission queue in priority order and
//! spawns one admission task per admissible request. A permit from the
//! coordinator's budget semaphore is taken before every scan, so no more than
//! `max_concurrent_votes` admission tasks ever run at once.
//!
//! A scan pops entries until it finds one it can admit. Entries whose voter
//! already has an admission in flight are set aside and put back (with fresh
//! insertion counters) once the scan ends, so one busy voter never blocks the
//! requests queued behind it. With nothing admissible the scheduler sleeps
//! until an enqueue or task completion wakes it, or the poll ceiling elapses.

use std::sync::Arc;
use tokio::sync::{watch, OwnedSemaphorePermit};

use crate::common::{Error, ReplicationRecord, Result};
use crate::coordinator::guard::InProgressMark;
use crate::coordinator::queue::{QueueEntry, VoteOutcome, VoteRequest};
use crate::coordinator::registry::Voter;
use crate::coordinator::server::Coordinator;
use crate::coordinator::session::Session;

/// An entry picked by a scan, together with its voter's in-progress mark.
struct Admission {
    entry: QueueEntry,
    session: Session,
    mark: InProgressMark,
}

impl Coordinator {
    pub(crate) async fn run_scheduler(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "Vote scheduler started (max {} concurrent admissions)",
            self.config.max_concurrent_votes
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let permit = tokio::select! {
                permit = Arc::clone(&self.budget).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.changed() => break,
            };

            if let Some(admission) = self.next_admissible() {
                tokio::spawn(Arc::clone(&self).admit(admission, permit));
                continue;
            }
            drop(permit);

            tokio::select! {
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(self.config.poll_ceiling()) => {}
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!("Vote scheduler stopped ({} requests still queued)", self.queue.len());
    }

    /// One scan over the queue. Returns the first admissible entry with its
    /// voter marked in progress.
    fn next_admissible(&self) -> Option<Admission> {
        let mut deferred = Vec::new();
        let mut picked = None;

        while let Some(entry) = self.queue.pop() {
            let session = match self.sessions.lookup(&entry.request.session_id) {
                Ok(session) => session,
                Err(e) => {
                    self.finish(entry.request, VoteOutcome::rejected(&e));
                    continue;
                }
            };

            match self.in_progress.try_mark(entry.voter_id) {
                Some(mark) => {
                    picked = Some(Admission {
                        entry,
                        session,
                        mark,
                    });
                    break;
                }
                None => {
                    tracing::debug!(
                        "Voter {} already in progress, deferring request {}",
                        entry.voter_id,
                        entry.request.request_id
                    );
                    self.metrics.votes_requeued.inc();
                    deferred.push(entry);
                }
            }
        }

        self.queue.requeue(deferred);
        picked
    }

    /// Admission task body. The mark is released before the outcome is
    /// published and the permit after it.
    async fn admit(self: Arc<Self>, admission: Admission, permit: OwnedSemaphorePermit) {
        let Admission {
            entry,
            session,
            mark,
        } = admission;
        let request = entry.request;

        let result = self.apply_vote(&session, &request).await;
        drop(mark);

        let outcome = match result {
            Ok(voter) => {
                tracing::info!(
                    "Vote committed: voter {} -> {} (ts={})",
                    voter.id,
                    request.candidate,
                    request.logical_timestamp
                );
                VoteOutcome::Committed {
                    voter_id: voter.id,
                    candidate: request.candidate.clone(),
                }
            }
            Err(e) => {
                tracing::info!(
                    "Vote request {} from voter {} rejected: {}",
                    request.request_id,
                    session.voter_id,
                    e
                );
                self.notifications
                    .push(format!("Vote rejected for {}: {}", session.voter_name, e));
                VoteOutcome::rejected(&e)
            }
        };

        self.finish(request, outcome);
        drop(permit);
        self.wake.notify_one();
    }

    async fn apply_vote(&self, session: &Session, request: &VoteRequest) -> Result<Voter> {
        self.election.check_admissible(request.click_time)?;
        self.clock.observe(request.logical_timestamp);

        let voter =
            self.registry
                .commit_vote(session.voter_id, &session.voter_name, &request.candidate)?;

        // Registry lock is released here; the in-progress mark keeps this
        // voter exclusive while replicas are contacted.
        let record = ReplicationRecord::Vote {
            voter_id: voter.id,
            candidate: request.candidate.clone(),
            timestamp: request.logical_timestamp,
        };
        if !self.replicator.replicate(&record).await {
            if let Err(e) = self.registry.rollback_vote(voter.id) {
                tracing::error!("Rollback of voter {} failed: {}", voter.id, e);
            }
            self.metrics.replication_failures.inc();
            self.metrics.rollbacks.inc();
            tracing::warn!("Vote of voter {} rolled back: replication failed", voter.id);
            return Err(Error::ReplicationFailed);
        }

        self.notifications
            .push(format!("{} voted for {}", voter.name, request.candidate));
        Ok(voter)
    }

    /// Record a terminal outcome and answer the waiting submitter, if any.
    pub(crate) fn finish(&self, mut request: VoteRequest, outcome: VoteOutcome) {
        if outcome.is_committed() {
            self.metrics.votes_committed.inc();
        } else {
            self.metrics.votes_rejected.inc();
        }
        self.metrics
            .admission_latency
            .observe(request.enqueued_at.elapsed().as_secs_f64() * 1000.0);

        self.outcomes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .record(request.request_id, outcome.clone());

        if let Some(tx) = request.responder.take() {
            // Submitter may have stopped waiting; the outcome table still has it.
            let _ = tx.send(outcome);
        }
    }
}
