//! Configuration for minivote components

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::common::{Error, Result};

/// Global configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Coordinator-specific config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<CoordinatorConfig>,

    /// Replica-specific config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica: Option<ReplicaConfig>,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from an optional TOML file, then `MINIVOTE_*`
    /// environment variables (`MINIVOTE_COORDINATOR__MAX_CONCURRENT_VOTES=8`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                builder = builder.add_source(config::File::with_name("minivote").required(false));
            }
        }
        builder = builder.add_source(
            config::Environment::with_prefix("MINIVOTE")
                .prefix_separator("_")
                .separator("__"),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        if let Some(coord) = &config.coordinator {
            coord.validate()?;
        }
        Ok(config)
    }
}

/// How many replica acknowledgements make a replication successful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuorumPolicy {
    /// At least one configured replica acknowledged.
    #[default]
    AnyAck,
    /// Strictly more than half of the configured replicas acknowledged.
    Majority,
}

impl QuorumPolicy {
    /// Decide whether `acks` out of `total` replicas satisfies the policy.
    pub fn is_satisfied(&self, acks: usize, total: usize) -> bool {
        match self {
            QuorumPolicy::AnyAck => acks >= 1,
            QuorumPolicy::Majority => acks * 2 > total || total == 0,
        }
    }
}

impl std::str::FromStr for QuorumPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "any" | "any_ack" | "anyack" => Ok(QuorumPolicy::AnyAck),
            "majority" => Ok(QuorumPolicy::Majority),
            other => Err(Error::InvalidConfig(format!("unknown quorum policy: {}", other))),
        }
    }
}

impl std::fmt::Display for QuorumPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuorumPolicy::AnyAck => write!(f, "any_ack"),
            QuorumPolicy::Majority => write!(f, "majority"),
        }
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Bind address for the HTTP RPC surface
    #[serde(default = "default_coord_bind")]
    pub bind_addr: SocketAddr,

    /// Replica base URLs (e.g. `http://127.0.0.1:8001`)
    #[serde(default = "default_replicas")]
    pub replicas: Vec<String>,

    /// Quorum rule applied to replica acknowledgements
    #[serde(default)]
    pub quorum: QuorumPolicy,

    /// Upper bound on admission tasks running at once
    #[serde(default = "default_max_concurrent_votes")]
    pub max_concurrent_votes: usize,

    /// Longest the scheduler sleeps without a wake-up signal
    #[serde(default = "default_poll_ceiling")]
    pub scheduler_poll_ceiling_ms: u64,

    /// Per-replica delivery timeout
    #[serde(default = "default_replication_timeout")]
    pub replication_timeout_ms: u64,

    /// Notification ring buffer capacity
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,

    /// Number of terminal vote outcomes kept for lookup
    #[serde(default = "default_outcome_retention")]
    pub outcome_retention: usize,

    /// Ballot options
    #[serde(default = "default_candidates")]
    pub candidates: Vec<String>,

    /// Voters registered at startup, assigned ids 1..=n in order
    #[serde(default = "default_voters")]
    pub voters: Vec<String>,
}

fn default_coord_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}
fn default_replicas() -> Vec<String> {
    vec![
        "http://127.0.0.1:8001".to_string(),
        "http://127.0.0.1:8002".to_string(),
    ]
}
fn default_max_concurrent_votes() -> usize {
    5
}
fn default_poll_ceiling() -> u64 {
    100
}
fn default_replication_timeout() -> u64 {
    2_000
}
fn default_notification_capacity() -> usize {
    100
}
fn default_outcome_retention() -> usize {
    1024
}

/// Default ballot options: `Candidate A` through `Candidate J`.
pub fn default_candidates() -> Vec<String> {
    ('A'..='J').map(|c| format!("Candidate {}", c)).collect()
}

/// Default roster shared by the coordinator and its replicas.
pub fn default_voters() -> Vec<String> {
    [
        "Alice", "Bob", "Charlie", "Diana", "Eve", "Frank", "Grace", "Henry", "Ivy", "Jack",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_coord_bind(),
            replicas: default_replicas(),
            quorum: QuorumPolicy::default(),
            max_concurrent_votes: default_max_concurrent_votes(),
            scheduler_poll_ceiling_ms: default_poll_ceiling(),
            replication_timeout_ms: default_replication_timeout(),
            notification_capacity: default_notification_capacity(),
            outcome_retention: default_outcome_retention(),
            candidates: default_candidates(),
            voters: default_voters(),
        }
    }
}

impl CoordinatorConfig {
    pub fn poll_ceiling(&self) -> Duration {
        Duration::from_millis(self.scheduler_poll_ceiling_ms)
    }

    pub fn replication_timeout(&self) -> Duration {
        Duration::from_millis(self.replication_timeout_ms)
    }

    /// Reject settings the coordinator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_votes == 0 {
            return Err(Error::InvalidConfig(
                "max_concurrent_votes must be at least 1".into(),
            ));
        }
        if self.scheduler_poll_ceiling_ms == 0 {
            return Err(Error::InvalidConfig(
                "scheduler_poll_ceiling_ms must be positive".into(),
            ));
        }
        if self.candidates.is_empty() {
            return Err(Error::InvalidConfig("candidate list is empty".into()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.candidates.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(Error::InvalidConfig(format!("duplicate candidate: {}", dup)));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.voters.iter().find(|v| !seen.insert(v.as_str())) {
            return Err(Error::InvalidConfig(format!("duplicate voter: {}", dup)));
        }
        Ok(())
    }
}

/// Replica configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaConfig {
    /// Bind address for the replication endpoint
    #[serde(default = "default_replica_bind")]
    pub bind_addr: SocketAddr,

    /// Initial roster mirrored from the coordinator
    #[serde(default = "default_voters")]
    pub voters: Vec<String>,
}

fn default_replica_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8001))
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_replica_bind(),
            voters: default_voters(),
        }
    }
}
