//! Follower replica
//!
//! Applies replication records pushed by the coordinator to its own copy of
//! the voter roster and election flags. Replicas never serve clients.

pub mod http;
pub mod server;
pub mod store;

pub use server::ReplicaServer;
pub use store::ReplicaStore;
