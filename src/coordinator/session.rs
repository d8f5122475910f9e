//! Session store: opaque session id → voter identity.
//!
//! Sessions are created on login and only ever looked up afterwards. There
//! is no expiry or deletion here; logout belongs to the HTTP front ends.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

use crate::common::{unix_time_now, Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub voter_id: u64,
    pub voter_name: String,
    /// Unix seconds
    pub login_time: f64,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for an already-validated voter and return its id.
    ///
    /// Ids combine the voter id with a random suffix, so two logins by the
    /// same voter within one second still get distinct sessions.
    pub fn create_session(&self, voter_id: u64, voter_name: &str) -> String {
        let session_id = format!("session_{}_{}", voter_id, Uuid::new_v4().simple());
        let session = Session {
            session_id: session_id.clone(),
            voter_id,
            voter_name: voter_name.to_string(),
            login_time: unix_time_now(),
        };
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.clone(), session);
        session_id
    }

    /// Resolve a session id; unknown ids are `InvalidSession`.
    pub fn lookup(&self, session_id: &str) -> Result<Session> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
            .ok_or(Error::InvalidSession)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
