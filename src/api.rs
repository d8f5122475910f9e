//! Request and response records of the coordinator RPC surface.
//!
//! Shared by the axum handlers and [`crate::client::CoordinatorClient`].
//! Successful calls return the operation's record with `success: true`;
//! failures return [`ErrorResponse`] with a non-2xx status.

use serde::{Deserialize, Serialize};

use crate::common::Notification;
use crate::coordinator::queue::VoteOutcome;
use crate::coordinator::registry::Voter;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    /// Error variant name, e.g. `AlreadyVoted`
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub id: u64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub voter_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub session_id: String,
    pub has_voted: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsResponse {
    pub success: bool,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequestBody {
    pub session_id: String,
    pub candidate: String,
    /// Logical timestamp, normally the `lamport_clock` from `GetServerTime`
    pub timestamp: u64,
    /// Client click time, Unix seconds
    pub click_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub success: bool,
    pub message: String,
    pub queued: bool,
    pub request_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteOutcomeResponse {
    pub success: bool,
    pub request_id: u64,
    pub outcome: VoteOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerTimeResponse {
    pub success: bool,
    /// Unix seconds
    pub server_time: f64,
    pub lamport_clock: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterDatabaseResponse {
    pub success: bool,
    pub voters: Vec<Voter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTimerRequest {
    /// Unix seconds
    pub end_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTally {
    pub candidate: String,
    pub votes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<CandidateTally>,
    pub total_votes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingStatusResponse {
    pub success: bool,
    pub voting_active: bool,
    pub deadline: Option<f64>,
    pub results_published: bool,
    pub queue_length: usize,
    pub in_flight: usize,
    pub lamport_clock: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsResponse {
    pub success: bool,
    pub notifications: Vec<Notification>,
}
