//! Replication wire types shared by the coordinator and its replicas.
//!
//! On the wire a record is `{"operation": "<name>", "payload": {...}}`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "payload", rename_all = "snake_case")]
pub enum ReplicationRecord {
    Vote {
        voter_id: u64,
        candidate: String,
        timestamp: u64,
    },
    Register {
        id: u64,
        name: String,
    },
    #[serde(rename = "set_timer")]
    SetDeadline {
        end_time: f64,
    },
    #[serde(rename = "start_vote")]
    StartVoting {},
    #[serde(rename = "stop_vote")]
    StopVoting {},
    PublishResults {},
}

impl ReplicationRecord {
    /// Wire name of the operation
    pub fn operation(&self) -> &'static str {
        match self {
            ReplicationRecord::Vote { .. } => "vote",
            ReplicationRecord::Register { .. } => "register",
            ReplicationRecord::SetDeadline { .. } => "set_timer",
            ReplicationRecord::StartVoting {} => "start_vote",
            ReplicationRecord::StopVoting {} => "stop_vote",
            ReplicationRecord::PublishResults {} => "publish_results",
        }
    }
}

/// Replica response to `ReplicateUpdate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicateAck {
    pub success: bool,
}
