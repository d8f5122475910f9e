//! HTTP API for the coordinator
//!
//! Every RPC operation is a JSON endpoint. Failures are rendered as
//! [`ErrorResponse`] with a status from [`Error::to_http_status`].
//!
//! | Method | Path              | Operation          |
//! |--------|-------------------|--------------------|
//! | POST   | `/register`       | Register           |
//! | POST   | `/login`          | Login              |
//! | GET    | `/options`        | GetVotingOptions   |
//! | POST   | `/vote`           | Vote               |
//! | GET    | `/vote/:id`       | vote outcome       |
//! | GET    | `/time`           | GetServerTime      |
//! | GET    | `/admin/voters`   | GetVoterDatabase   |
//! | POST   | `/admin/timer`    | SetTimer           |
//! | POST   | `/admin/start`    | StartVote          |
//! | POST   | `/admin/stop`     | StopVote           |
//! | POST   | `/admin/publish`  | PublishResults     |
//! | GET    | `/status`         | GetVotingStatus    |
//! | GET    | `/notifications`  | notification log   |

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::api::*;
use crate::common::tracing_middleware::request_tracing_middleware;
use crate::common::{Error, Result};
use crate::coordinator::server::Coordinator;

/// Request bodies are small JSON records.
const MAX_BODY_BYTES: usize = 64 * 1024;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.to_http_status();
        if self.is_client_error() {
            tracing::debug!("Request rejected: {}", self);
        } else {
            tracing::error!("Request failed: {}", self);
        }
        let body = ErrorResponse {
            success: false,
            message: self.to_string(),
            reason: self.reason().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn create_router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/options", get(options))
        .route("/vote", post(vote))
        .route("/vote/:request_id", get(vote_outcome))
        .route("/time", get(server_time))
        .route("/status", get(voting_status))
        .route("/notifications", get(notifications))
        // Admin
        .route("/admin/voters", get(voter_database))
        .route("/admin/timer", post(set_timer))
        .route("/admin/start", post(start_vote))
        .route("/admin/stop", post(stop_vote))
        .route("/admin/publish", post(publish_results))
        // Health & metrics
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(request_tracing_middleware))
        .with_state(coordinator)
}

async fn register(
    State(coord): State<Arc<Coordinator>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    let (id, message) = coord.register(&req.name).await?;
    Ok(Json(RegisterResponse {
        success: true,
        id,
        message: message.to_string(),
    }))
}

async fn login(
    State(coord): State<Arc<Coordinator>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let (session_id, has_voted) = coord.login(&req.name, req.voter_id)?;
    Ok(Json(LoginResponse {
        success: true,
        session_id,
        has_voted,
        message: format!("Welcome, {}", req.name),
    }))
}

async fn options(State(coord): State<Arc<Coordinator>>) -> Json<OptionsResponse> {
    Json(OptionsResponse {
        success: true,
        candidates: coord.options(),
    })
}

/// Returns as soon as the request is queued; poll `/vote/:id` for the outcome.
async fn vote(
    State(coord): State<Arc<Coordinator>>,
    Json(req): Json<VoteRequestBody>,
) -> Result<Json<VoteResponse>> {
    let ticket = coord.submit_vote(&req.session_id, &req.candidate, req.timestamp, req.click_time)?;
    Ok(Json(VoteResponse {
        success: true,
        message: format!("Vote request queued (queue size: {})", ticket.queue_length),
        queued: true,
        request_id: ticket.request_id,
    }))
}

async fn vote_outcome(
    State(coord): State<Arc<Coordinator>>,
    Path(request_id): Path<u64>,
) -> Result<Json<VoteOutcomeResponse>> {
    let outcome = coord
        .vote_outcome(request_id)
        .ok_or_else(|| Error::InvalidRequest(format!("unknown vote request {}", request_id)))?;
    Ok(Json(VoteOutcomeResponse {
        success: true,
        request_id,
        outcome,
    }))
}

async fn server_time(State(coord): State<Arc<Coordinator>>) -> Json<ServerTimeResponse> {
    let (server_time, lamport_clock) = coord.server_time();
    Json(ServerTimeResponse {
        success: true,
        server_time,
        lamport_clock,
    })
}

async fn voting_status(State(coord): State<Arc<Coordinator>>) -> Json<VotingStatusResponse> {
    let status = coord.status();
    Json(VotingStatusResponse {
        success: true,
        voting_active: status.phase.voting_active,
        deadline: status.phase.deadline,
        results_published: status.phase.results_published,
        queue_length: status.queue_length,
        in_flight: status.in_flight,
        lamport_clock: status.lamport_clock,
    })
}

async fn notifications(State(coord): State<Arc<Coordinator>>) -> Json<NotificationsResponse> {
    Json(NotificationsResponse {
        success: true,
        notifications: coord.notifications(),
    })
}

async fn voter_database(State(coord): State<Arc<Coordinator>>) -> Json<VoterDatabaseResponse> {
    Json(VoterDatabaseResponse {
        success: true,
        voters: coord.voters(),
    })
}

async fn set_timer(
    State(coord): State<Arc<Coordinator>>,
    Json(req): Json<SetTimerRequest>,
) -> Result<Json<AckResponse>> {
    if !req.end_time.is_finite() {
        return Err(Error::InvalidRequest("end_time must be a finite number".into()));
    }
    coord.set_timer(req.end_time).await;
    Ok(Json(AckResponse {
        success: true,
        message: "Voting deadline set".into(),
    }))
}

async fn start_vote(State(coord): State<Arc<Coordinator>>) -> Json<AckResponse> {
    coord.start_vote().await;
    Json(AckResponse {
        success: true,
        message: "Voting started".into(),
    })
}

async fn stop_vote(State(coord): State<Arc<Coordinator>>) -> Json<AckResponse> {
    coord.stop_vote().await;
    Json(AckResponse {
        success: true,
        message: "Voting stopped".into(),
    })
}

async fn publish_results(State(coord): State<Arc<Coordinator>>) -> Result<Json<PublishResponse>> {
    let results = coord.publish_results().await?;
    Ok(Json(PublishResponse {
        success: true,
        message: "Results published".into(),
        results: results.tallies,
        total_votes: results.total_votes,
    }))
}

async fn health(State(coord): State<Arc<Coordinator>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "voters": coord.voters().len(),
            "queue_length": coord.status().queue_length,
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

// Prometheus text format
async fn metrics(State(coord): State<Arc<Coordinator>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        coord.metrics_text(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::CoordinatorConfig;
    use crate::coordinator::replicator::InMemoryReplicator;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    fn app() -> (Arc<Coordinator>, Router) {
        let config = CoordinatorConfig {
            replicas: vec![],
            ..Default::default()
        };
        let coord =
            Arc::new(Coordinator::new(config, Arc::new(InMemoryReplicator::new())).unwrap());
        let router = create_router(Arc::clone(&coord));
        (coord, router)
    }

    async fn send<T: DeserializeOwned>(
        router: &Router,
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, T) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let (_coord, router) = app();

        let (status, resp): (_, RegisterResponse) =
            send(&router, "POST", "/register", json!({"name": "Zoe"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.id, 11);
        assert_eq!(resp.message, "Registration successful");

        let (_, again): (_, RegisterResponse) =
            send(&router, "POST", "/register", json!({"name": "Zoe"})).await;
        assert_eq!(again.id, 11);
        assert_eq!(again.message, "Voter already registered");

        let (status, login): (_, LoginResponse) = send(
            &router,
            "POST",
            "/login",
            json!({"name": "Zoe", "voter_id": 11}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(login.session_id.starts_with("session_11_"));
        assert!(!login.has_voted);
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let (_coord, router) = app();
        let (status, err): (_, ErrorResponse) = send(
            &router,
            "POST",
            "/login",
            json!({"name": "Alice", "voter_id": 2}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(!err.success);
        assert_eq!(err.reason, "InvalidCredentials");
    }

    #[tokio::test]
    async fn test_vote_rejections_at_submission() {
        let (coord, router) = app();
        let (session, _) = coord.login("Alice", 1).unwrap();

        let (status, err): (_, ErrorResponse) = send(
            &router,
            "POST",
            "/vote",
            json!({"session_id": session, "candidate": "Nobody", "timestamp": 1, "click_time": 0.0}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.reason, "InvalidCandidate");

        let (status, err): (_, ErrorResponse) = send(
            &router,
            "POST",
            "/vote",
            json!({"session_id": "bogus", "candidate": "Candidate A", "timestamp": 1, "click_time": 0.0}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.reason, "InvalidSession");
    }

    #[tokio::test]
    async fn test_vote_is_queued_and_outcome_pending() {
        let (coord, router) = app();
        let (session, _) = coord.login("Bob", 2).unwrap();

        // Scheduler not started: the request stays queued.
        let (status, resp): (_, VoteResponse) = send(
            &router,
            "POST",
            "/vote",
            json!({"session_id": session, "candidate": "Candidate B", "timestamp": 4, "click_time": 0.0}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(resp.queued);
        assert_eq!(resp.message, "Vote request queued (queue size: 1)");

        let uri = format!("/vote/{}", resp.request_id);
        let (_, outcome): (_, VoteOutcomeResponse) =
            send(&router, "GET", &uri, serde_json::Value::Null).await;
        assert_eq!(outcome.outcome, crate::coordinator::queue::VoteOutcome::Pending);

        let (_, status): (_, VotingStatusResponse) =
            send(&router, "GET", "/status", serde_json::Value::Null).await;
        assert_eq!(status.queue_length, 1);
        assert!(!status.voting_active);
    }

    #[tokio::test]
    async fn test_publish_requires_stopped_voting() {
        let (_coord, router) = app();
        let (_, _): (_, AckResponse) =
            send(&router, "POST", "/admin/start", serde_json::Value::Null).await;

        let (status, err): (_, ErrorResponse) =
            send(&router, "POST", "/admin/publish", serde_json::Value::Null).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err.reason, "VotingStillActive");

        let (_, _): (_, AckResponse) =
            send(&router, "POST", "/admin/stop", serde_json::Value::Null).await;
        let (status, published): (_, PublishResponse) =
            send(&router, "POST", "/admin/publish", serde_json::Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(published.total_votes, 0);
        assert_eq!(published.results.len(), 10);
    }

    #[tokio::test]
    async fn test_server_time_and_options() {
        let (_coord, router) = app();
        let (_, time): (_, ServerTimeResponse) =
            send(&router, "GET", "/time", serde_json::Value::Null).await;
        assert!(time.server_time > 0.0);

        let (_, opts): (_, OptionsResponse) =
            send(&router, "GET", "/options", serde_json::Value::Null).await;
        assert_eq!(opts.candidates.first().map(String::as_str), Some("Candidate A"));
    }
}
