//! HTTP API for a replica

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::VoterDatabaseResponse;
use crate::common::{ReplicateAck, ReplicationRecord};
use crate::replica::store::ReplicaStore;

pub fn create_router(store: Arc<ReplicaStore>) -> Router {
    Router::new()
        .route("/replicate", post(replicate))
        .route("/voters", get(voters))
        .route("/status", get(status))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// `ReplicateUpdate`. A body that does not parse as a record is refused with
/// `success: false`.
async fn replicate(State(store): State<Arc<ReplicaStore>>, body: Bytes) -> impl IntoResponse {
    match serde_json::from_slice::<ReplicationRecord>(&body) {
        Ok(record) => {
            let success = store.apply(&record);
            (StatusCode::OK, Json(ReplicateAck { success }))
        }
        Err(e) => {
            tracing::warn!("Malformed replication record: {}", e);
            (StatusCode::BAD_REQUEST, Json(ReplicateAck { success: false }))
        }
    }
}

async fn voters(State(store): State<Arc<ReplicaStore>>) -> Json<VoterDatabaseResponse> {
    Json(VoterDatabaseResponse {
        success: true,
        voters: store.voters(),
    })
}

async fn status(State(store): State<Arc<ReplicaStore>>) -> impl IntoResponse {
    let phase = store.phase();
    Json(json!({
        "success": true,
        "voting_active": phase.voting_active,
        "deadline": phase.deadline,
        "results_published": phase.results_published,
        "applied": store.applied(),
    }))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "role": "replica",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
