//! Vote coordinator
//!
//! The coordinator is responsible for:
//! - Voter registration, login and sessions
//! - Ordering vote requests by Lamport timestamp
//! - Admitting at most one vote per voter, with bounded concurrency
//! - Replicating committed mutations, rolling back on failure
//! - Election phase (start, stop, deadline, results)

pub mod clock;
pub mod election;
pub mod guard;
pub mod http;
pub mod queue;
pub mod registry;
pub mod replicator;
mod scheduler;
pub mod server;
pub mod session;

pub use replicator::{HttpReplicator, InMemoryReplicator, NoopReplicator, Replicator};
pub use server::{Coordinator, Results, VoteTicket, VotingStatus};
