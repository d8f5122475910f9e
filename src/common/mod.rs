//! Common utilities and types shared across minivote

pub mod config;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod replication;
pub mod tracing_middleware;
pub mod utils;

pub use config::{Config, CoordinatorConfig, QuorumPolicy, ReplicaConfig};
pub use error::{Error, Result};
pub use metrics::VoteMetrics;
pub use notify::{Notification, NotificationLog};
pub use replication::{ReplicateAck, ReplicationRecord};
pub use utils::{format_unix_time, unix_time_now, validate_name};
