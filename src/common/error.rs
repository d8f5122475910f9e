//! Error types for minivote

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Ballot Errors ===
    #[error("Invalid session")]
    InvalidSession,

    #[error("Invalid candidate: {0}")]
    InvalidCandidate(String),

    #[error("Voter not found")]
    VoterNotFound,

    #[error("Already voted")]
    AlreadyVoted,

    #[error("Vote submitted after deadline")]
    DeadlineExceeded,

    #[error("Voting is not active")]
    VotingNotActive,

    #[error("Cannot publish results while voting is active")]
    VotingStillActive,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // === Replication Errors ===
    #[error("Replication failed")]
    ReplicationFailed,

    #[error("Registration failed due to replication error")]
    RegistrationReplicationFailed,

    // === Network Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A failure reported by a remote coordinator, as seen by the client.
    #[error("{message} ({reason})")]
    Remote { reason: String, message: String },

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Machine-readable variant name carried in RPC responses.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::InvalidSession => "InvalidSession",
            Error::InvalidCandidate(_) => "InvalidCandidate",
            Error::VoterNotFound => "VoterNotFound",
            Error::AlreadyVoted => "AlreadyVoted",
            Error::DeadlineExceeded => "DeadlineExceeded",
            Error::VotingNotActive => "VotingNotActive",
            Error::VotingStillActive => "VotingStillActive",
            Error::InvalidCredentials => "InvalidCredentials",
            Error::InvalidRequest(_) => "InvalidRequest",
            Error::ReplicationFailed => "ReplicationFailed",
            Error::RegistrationReplicationFailed => "RegistrationReplicationFailed",
            Error::Io(_) => "Io",
            Error::Http(_) => "Http",
            Error::Serialization(_) => "Serialization",
            Error::Remote { .. } => "Remote",
            Error::InvalidConfig(_) => "InvalidConfig",
            Error::Internal(_) => "Internal",
        }
    }

    /// Errors caused by the caller's request rather than by the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidSession
                | Error::InvalidCandidate(_)
                | Error::VoterNotFound
                | Error::AlreadyVoted
                | Error::DeadlineExceeded
                | Error::VotingNotActive
                | Error::VotingStillActive
                | Error::InvalidCredentials
                | Error::InvalidRequest(_)
        )
    }

    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::InvalidSession | Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::InvalidCandidate(_) | Error::InvalidRequest(_) | Error::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::VoterNotFound => StatusCode::NOT_FOUND,
            Error::AlreadyVoted | Error::VotingStillActive => StatusCode::CONFLICT,
            Error::DeadlineExceeded | Error::VotingNotActive => StatusCode::FORBIDDEN,
            Error::ReplicationFailed | Error::RegistrationReplicationFailed => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_reason_names_variant() {
        assert_eq!(Error::AlreadyVoted.reason(), "AlreadyVoted");
        assert_eq!(
            Error::InvalidCandidate("Nobody".into()).reason(),
            "InvalidCandidate"
        );
        assert_eq!(Error::ReplicationFailed.reason(), "ReplicationFailed");
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(Error::InvalidSession.to_http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::AlreadyVoted.to_http_status(), StatusCode::CONFLICT);
        assert_eq!(
            Error::ReplicationFailed.to_http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert!(Error::DeadlineExceeded.is_client_error());
        assert!(!Error::ReplicationFailed.is_client_error());
    }
}
