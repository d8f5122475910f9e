//! # minivote
//!
//! A small distributed vote-tabulation service:
//! - Lamport clock ordering of vote requests
//! - At most one committed ballot per voter, enforced under concurrency
//! - Bounded number of votes admitted at once
//! - Replication of every mutation to follower replicas, with rollback when
//!   replication misses quorum
//! - HTTP/JSON for both the client API and replica delivery
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Coordinator                │
//! │  sessions · registry · Lamport clock    │
//! │  admission queue → scheduler → tasks    │
//! └───────────┬─────────────────────────────┘
//!             │ POST /replicate
//!   ┌─────────┴──────────┐
//!   │                    │
//! ┌─▼──────────┐   ┌─────▼──────┐
//! │ Replica 1  │   │ Replica 2  │
//! │ (mirror)   │   │ (mirror)   │
//! └────────────┘   └────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start the replicas
//! ```bash
//! minivote-replica serve --bind 127.0.0.1:8001
//! minivote-replica serve --bind 127.0.0.1:8002
//! ```
//!
//! ### Start the coordinator
//! ```bash
//! minivote-coord serve \
//!   --bind 0.0.0.0:8000 \
//!   --replicas http://127.0.0.1:8001,http://127.0.0.1:8002
//! ```
//!
//! ### Use the CLI
//! ```bash
//! minivote start
//! minivote login Alice 1
//! minivote vote Alice 1 "Candidate A"
//! minivote stop
//! minivote publish
//! ```

#![allow(clippy::result_large_err)]

pub mod api;
pub mod client;
pub mod common;
pub mod coordinator;
pub mod replica;

// Re-export commonly used types
pub use client::CoordinatorClient;
pub use common::{Config, Error, Result};
pub use coordinator::Coordinator;
pub use replica::ReplicaServer;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
