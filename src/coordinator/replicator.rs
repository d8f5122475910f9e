//! Replication to follower replicas
//!
//! The coordinator pushes every committed mutation through a [`Replicator`].
//! Delivery is attempted once per replica; a failing replica never aborts
//! delivery to the others, and nothing is retried or queued for later.
//!
//! Success is decided by [`QuorumPolicy`]. The default, `AnyAck`, only asks
//! for one acknowledging replica: a liveness bar, weaker than majority
//! quorum replication. `Majority` requires more than half of the configured
//! replicas.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::common::{QuorumPolicy, ReplicateAck, ReplicationRecord};

#[async_trait]
pub trait Replicator: Send + Sync {
    /// Deliver `record` to the replicas; `true` when the quorum rule is met.
    async fn replicate(&self, record: &ReplicationRecord) -> bool;
}

/// Accepts everything and sends nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReplicator;

#[async_trait]
impl Replicator for NoopReplicator {
    async fn replicate(&self, _record: &ReplicationRecord) -> bool {
        true
    }
}

/// Records delivered operations in memory; can be told to fail or to delay
/// each delivery.
#[derive(Debug, Default)]
pub struct InMemoryReplicator {
    records: Mutex<Vec<ReplicationRecord>>,
    failing: AtomicBool,
    latency: Mutex<Duration>,
}

impl InMemoryReplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        let replicator = Self::default();
        replicator.set_latency(latency);
        replicator
    }

    /// While failing, every call reports quorum failure and records nothing.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Successfully delivered records, in delivery order
    pub fn records(&self) -> Vec<ReplicationRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Voter ids of delivered `vote` records, in delivery order
    pub fn vote_order(&self) -> Vec<u64> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                ReplicationRecord::Vote { voter_id, .. } => Some(voter_id),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Replicator for InMemoryReplicator {
    async fn replicate(&self, record: &ReplicationRecord) -> bool {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return false;
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        true
    }
}

/// Delivers records to replica HTTP endpoints (`POST {base}/replicate`).
pub struct HttpReplicator {
    client: reqwest::Client,
    replicas: Vec<String>,
    quorum: QuorumPolicy,
    timeout: Duration,
}

impl HttpReplicator {
    pub fn new(replicas: Vec<String>, quorum: QuorumPolicy, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            replicas,
            quorum,
            timeout,
        }
    }

    async fn deliver(&self, base: &str, record: &ReplicationRecord) -> bool {
        let url = format!("{}/replicate", base.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(record)
            .send()
            .await;
        match resp {
            Ok(resp) if resp.status().is_success() => match resp.json::<ReplicateAck>().await {
                Ok(ack) => ack.success,
                Err(e) => {
                    tracing::warn!("Replica {} sent an unreadable ack: {}", base, e);
                    false
                }
            },
            Ok(resp) => {
                tracing::warn!(
                    "Replica {} rejected {}: HTTP {}",
                    base,
                    record.operation(),
                    resp.status()
                );
                false
            }
            Err(e) => {
                tracing::error!("Failed to replicate to replica {}: {}", base, e);
                false
            }
        }
    }
}

#[async_trait]
impl Replicator for HttpReplicator {
    async fn replicate(&self, record: &ReplicationRecord) -> bool {
        let attempts = self.replicas.iter().map(|base| self.deliver(base, record));
        let acks = futures_util::future::join_all(attempts)
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count();

        let ok = self.quorum.is_satisfied(acks, self.replicas.len());
        if ok {
            tracing::debug!(
                "Replicated {} to {}/{} replicas",
                record.operation(),
                acks,
                self.replicas.len()
            );
        } else {
            tracing::warn!(
                "Replication of {} missed quorum ({}): {}/{} acks",
                record.operation(),
                self.quorum,
                acks,
                self.replicas.len()
            );
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(voter_id: u64) -> ReplicationRecord {
        ReplicationRecord::Vote {
            voter_id,
            candidate: "Candidate A".into(),
            timestamp: 1,
        }
    }

    #[tokio::test]
    async fn test_noop_always_succeeds() {
        assert!(NoopReplicator.replicate(&vote(1)).await);
    }

    #[tokio::test]
    async fn test_in_memory_records_and_fails_on_demand() {
        let replicator = InMemoryReplicator::new();
        assert!(replicator.replicate(&vote(1)).await);

        replicator.set_failing(true);
        assert!(!replicator.replicate(&vote(2)).await);

        replicator.set_failing(false);
        assert!(replicator.replicate(&vote(3)).await);
        assert_eq!(replicator.vote_order(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_http_unreachable_replicas_miss_quorum() {
        // Port 9 (discard) on localhost is not listening in test environments.
        let replicator = HttpReplicator::new(
            vec!["http://127.0.0.1:9".to_string()],
            QuorumPolicy::AnyAck,
            Duration::from_millis(500),
        );
        assert!(!replicator.replicate(&vote(1)).await);
    }

    #[tokio::test]
    async fn test_http_no_replicas() {
        let any = HttpReplicator::new(vec![], QuorumPolicy::AnyAck, Duration::from_millis(100));
        assert!(!any.replicate(&vote(1)).await);
        let majority =
            HttpReplicator::new(vec![], QuorumPolicy::Majority, Duration::from_millis(100));
        assert!(majority.replicate(&vote(1)).await);
    }
}
