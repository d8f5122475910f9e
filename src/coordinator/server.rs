//! Coordinator server
//!
//! One [`Coordinator`] per process owns every sub-component (clock, session
//! store, registry, admission queue, in-progress guard, replicator) and
//! implements the RPC operations. The HTTP layer holds it as
//! `Arc<Coordinator>`.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::{oneshot, watch, Mutex as AsyncMutex, Notify, Semaphore};
use tokio::task::JoinHandle;

use crate::api::CandidateTally;
use crate::common::{
    format_unix_time, unix_time_now, validate_name, CoordinatorConfig, Error, Notification,
    NotificationLog, ReplicationRecord, Result, VoteMetrics,
};
use crate::coordinator::clock::LamportClock;
use crate::coordinator::election::{ElectionState, Phase};
use crate::coordinator::guard::InProgressGuard;
use crate::coordinator::http::create_router;
use crate::coordinator::queue::{AdmissionQueue, VoteOutcome, VoteRequest};
use crate::coordinator::registry::{Registration, Voter, VoterRegistry};
use crate::coordinator::replicator::{HttpReplicator, Replicator};
use crate::coordinator::session::SessionStore;

/// Handle returned by [`Coordinator::submit_vote`]
#[derive(Debug)]
pub struct VoteTicket {
    pub request_id: u64,
    pub queue_length: usize,
    /// Resolves once the request reaches a terminal outcome
    pub outcome: oneshot::Receiver<VoteOutcome>,
}

/// Published tallies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Results {
    pub tallies: Vec<CandidateTally>,
    pub total_votes: u64,
}

/// Snapshot for `GetVotingStatus`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VotingStatus {
    pub phase: Phase,
    pub queue_length: usize,
    pub in_flight: usize,
    pub lamport_clock: u64,
}

/// Bounded table of vote outcomes by request id, oldest evicted first.
pub(crate) struct OutcomeTable {
    outcomes: HashMap<u64, VoteOutcome>,
    order: VecDeque<u64>,
    capacity: usize,
}

impl OutcomeTable {
    fn new(capacity: usize) -> Self {
        Self {
            outcomes: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub(crate) fn record(&mut self, request_id: u64, outcome: VoteOutcome) {
        if self.outcomes.insert(request_id, outcome).is_none() {
            self.order.push_back(request_id);
        }
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.outcomes.remove(&old);
            }
        }
    }

    fn get(&self, request_id: u64) -> Option<VoteOutcome> {
        self.outcomes.get(&request_id).cloned()
    }
}

pub struct Coordinator {
    pub(crate) config: CoordinatorConfig,
    pub(crate) clock: LamportClock,
    pub(crate) sessions: SessionStore,
    pub(crate) registry: VoterRegistry,
    pub(crate) queue: AdmissionQueue,
    pub(crate) in_progress: Arc<InProgressGuard>,
    pub(crate) election: ElectionState,
    pub(crate) replicator: Arc<dyn Replicator>,
    pub(crate) notifications: NotificationLog,
    pub(crate) metrics: VoteMetrics,
    pub(crate) outcomes: Mutex<OutcomeTable>,
    /// One permit per admission task allowed to run
    pub(crate) budget: Arc<Semaphore>,
    /// Signalled on enqueue and on admission-task completion
    pub(crate) wake: Notify,
    /// Held across prepare, replicate and insert of one registration
    registration_lock: AsyncMutex<()>,
    next_request_id: AtomicU64,
    scheduler: Mutex<Option<(watch::Sender<bool>, JoinHandle<()>)>>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig, replicator: Arc<dyn Replicator>) -> Result<Self> {
        config.validate()?;
        let registry = VoterRegistry::new(&config.voters, config.candidates.clone());
        Ok(Self {
            clock: LamportClock::new(),
            sessions: SessionStore::new(),
            registry,
            queue: AdmissionQueue::new(),
            in_progress: Arc::new(InProgressGuard::new()),
            election: ElectionState::new(),
            replicator,
            notifications: NotificationLog::new(config.notification_capacity),
            metrics: VoteMetrics::new(),
            outcomes: Mutex::new(OutcomeTable::new(config.outcome_retention)),
            budget: Arc::new(Semaphore::new(config.max_concurrent_votes)),
            wake: Notify::new(),
            registration_lock: AsyncMutex::new(()),
            next_request_id: AtomicU64::new(1),
            scheduler: Mutex::new(None),
            config,
        })
    }

    /// Build a coordinator replicating over HTTP to `config.replicas`.
    pub fn with_http_replicas(config: CoordinatorConfig) -> Result<Self> {
        if config.replicas.is_empty() {
            tracing::warn!(
                "No replicas configured; quorum policy {} will decide every replication alone",
                config.quorum
            );
        }
        let replicator = HttpReplicator::new(
            config.replicas.clone(),
            config.quorum,
            config.replication_timeout(),
        );
        Self::new(config, Arc::new(replicator))
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Spawn the background scheduler. Calling it again is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.scheduler.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(Arc::clone(self).run_scheduler(rx));
        *slot = Some((tx, handle));
    }

    /// Stop the scheduler. Admission tasks already running finish on their own;
    /// queued requests stay queued.
    pub async fn shutdown(&self) {
        let taken = self
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some((tx, handle)) = taken {
            let _ = tx.send(true);
            if let Err(e) = handle.await {
                tracing::error!("Scheduler task failed: {}", e);
            }
        }
    }

    pub async fn serve(self: Arc<Self>) -> Result<()> {
        tracing::info!("Starting coordinator");
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Replicas: {:?}", self.config.replicas);
        tracing::info!("  Quorum: {}", self.config.quorum);
        tracing::info!("  Max concurrent votes: {}", self.config.max_concurrent_votes);

        self.start();

        let router = create_router(Arc::clone(&self));
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!("✓ Coordinator ready");

        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down coordinator...");
            })
            .await;
        self.shutdown().await;
        result?;
        Ok(())
    }

    // === RPC operations ===

    /// `Register(name)`: idempotent by name. A new voter is stored, and
    /// becomes visible to login and later registrations, only once its
    /// replication succeeds. Registrations run one at a time.
    pub async fn register(&self, name: &str) -> Result<(u64, &'static str)> {
        let name = validate_name(name)?;
        self.clock.tick();

        let _serial = self.registration_lock.lock().await;
        let voter = match self.registry.prepare_registration(name) {
            Registration::Existing(id) => return Ok((id, "Voter already registered")),
            Registration::Created(voter) => voter,
        };

        let record = ReplicationRecord::Register {
            id: voter.id,
            name: voter.name.clone(),
        };
        if !self.replicator.replicate(&record).await {
            self.metrics.replication_failures.inc();
            self.metrics.rollbacks.inc();
            tracing::warn!("Registration of {} dropped: replication failed", voter.name);
            return Err(Error::RegistrationReplicationFailed);
        }

        let voter_id = self.registry.insert(voter.clone());
        self.metrics.registrations.inc();
        self.notifications
            .push(format!("New voter registered: {} (ID: {})", voter.name, voter_id));
        Ok((voter_id, "Registration successful"))
    }

    /// `Login(name, voterId)`: returns a fresh session id and the voter's
    /// ballot state.
    pub fn login(&self, name: &str, voter_id: u64) -> Result<(String, bool)> {
        self.clock.tick();
        let voter = self
            .registry
            .find_by_identity(voter_id, name)
            .map_err(|_| Error::InvalidCredentials)?;
        let session_id = self.sessions.create_session(voter.id, &voter.name);
        self.notifications.push(format!("{} logged in", voter.name));
        Ok((session_id, voter.has_voted))
    }

    pub fn options(&self) -> Vec<String> {
        self.registry.candidates().to_vec()
    }

    /// `Vote(session, candidate, timestamp, clickTime)`: validate, enqueue
    /// and return at once. The ticket's receiver yields the terminal outcome.
    pub fn submit_vote(
        &self,
        session_id: &str,
        candidate: &str,
        timestamp: u64,
        click_time: f64,
    ) -> Result<VoteTicket> {
        self.clock.tick();
        self.metrics.votes_submitted.inc();

        if !self.registry.is_candidate(candidate) {
            return Err(Error::InvalidCandidate(candidate.to_string()));
        }
        let session = self.sessions.lookup(session_id)?;
        if self.registry.has_voted(session.voter_id) == Some(true) {
            return Err(Error::AlreadyVoted);
        }

        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let request = VoteRequest {
            request_id,
            session_id: session_id.to_string(),
            candidate: candidate.to_string(),
            logical_timestamp: timestamp,
            click_time,
            enqueued_at: Instant::now(),
            responder: Some(tx),
        };

        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(request_id, VoteOutcome::Pending);
        let queue_length = self.queue.push(timestamp, session.voter_id, request);
        self.metrics.votes_queued.inc();
        self.notifications
            .push(format!("Vote request queued (queue size: {})", queue_length));
        self.wake.notify_one();

        Ok(VoteTicket {
            request_id,
            queue_length,
            outcome: rx,
        })
    }

    /// Latest known outcome of a submitted vote, if still retained.
    pub fn vote_outcome(&self, request_id: u64) -> Option<VoteOutcome> {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(request_id)
    }

    /// `GetServerTime`: wall clock and current Lamport time.
    pub fn server_time(&self) -> (f64, u64) {
        (unix_time_now(), self.clock.now())
    }

    pub fn voters(&self) -> Vec<Voter> {
        self.registry.snapshot()
    }

    pub async fn set_timer(&self, end_time: f64) {
        self.election.set_deadline(end_time);
        self.notifications.push(format!(
            "Voting deadline set to {}",
            format_unix_time(end_time)
        ));
        self.replicate_flag(ReplicationRecord::SetDeadline { end_time })
            .await;
    }

    pub async fn start_vote(&self) {
        self.election.start();
        self.notifications.push("Voting started");
        self.replicate_flag(ReplicationRecord::StartVoting {}).await;
        // Requests queued while voting was closed may now be admissible.
        self.wake.notify_one();
    }

    pub async fn stop_vote(&self) {
        self.election.stop();
        self.notifications.push("Voting stopped");
        self.replicate_flag(ReplicationRecord::StopVoting {}).await;
    }

    /// `PublishResults`: only once voting has been stopped. Admissions still
    /// in flight are drained first so every tallied ballot has either been
    /// replicated or rolled back.
    pub async fn publish_results(&self) -> Result<Results> {
        self.election.publish()?;

        let permits = u32::try_from(self.config.max_concurrent_votes)
            .map_err(|_| Error::Internal("admission budget exceeds u32".into()))?;
        let drained = self
            .budget
            .acquire_many(permits)
            .await
            .map_err(|e| Error::Internal(format!("admission budget closed: {}", e)))?;
        let tallies: Vec<CandidateTally> = self
            .registry
            .tally()
            .into_iter()
            .map(|(candidate, votes)| CandidateTally { candidate, votes })
            .collect();
        drop(drained);
        let total_votes = tallies.iter().map(|t| t.votes).sum();
        self.notifications
            .push(format!("Results published ({} votes)", total_votes));
        self.replicate_flag(ReplicationRecord::PublishResults {})
            .await;
        Ok(Results {
            tallies,
            total_votes,
        })
    }

    pub fn status(&self) -> VotingStatus {
        VotingStatus {
            phase: self.election.snapshot(),
            queue_length: self.queue.len(),
            in_flight: self.in_progress.len(),
            lamport_clock: self.clock.now(),
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.snapshot()
    }

    pub fn metrics_text(&self) -> String {
        self.metrics
            .to_prometheus(self.queue.len(), self.in_progress.len())
    }

    /// Most admission tasks ever running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.in_progress.peak()
    }

    /// Admin toggles are replicated best-effort: the primary's flag stands
    /// even when replicas miss it.
    async fn replicate_flag(&self, record: ReplicationRecord) {
        if !self.replicator.replicate(&record).await {
            self.metrics.replication_failures.inc();
            tracing::warn!("Replication of {} missed quorum", record.operation());
        }
    }
}
