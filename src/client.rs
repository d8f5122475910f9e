//! HTTP client for the coordinator RPC surface
//!
//! Used by the `minivote` CLI and by the end-to-end tests. Non-2xx replies
//! are decoded from [`ErrorResponse`] into [`Error::Remote`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::api::*;
use crate::common::{Error, Result};
use crate::coordinator::queue::VoteOutcome;

#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    client: reqwest::Client,
    base_url: String,
}

impl CoordinatorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<T>().await?);
        }
        let body = resp.bytes().await?;
        match serde_json::from_slice::<ErrorResponse>(&body) {
            Ok(err) => Err(Error::Remote {
                reason: err.reason,
                message: err.message,
            }),
            Err(_) => Err(Error::Remote {
                reason: format!("HTTP {}", status.as_u16()),
                message: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.client.get(self.url(path)).send().await?;
        Self::decode(resp).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(resp).await
    }

    pub async fn register(&self, name: &str) -> Result<RegisterResponse> {
        self.post(
            "/register",
            &RegisterRequest {
                name: name.to_string(),
            },
        )
        .await
    }

    pub async fn login(&self, name: &str, voter_id: u64) -> Result<LoginResponse> {
        self.post(
            "/login",
            &LoginRequest {
                name: name.to_string(),
                voter_id,
            },
        )
        .await
    }

    pub async fn options(&self) -> Result<Vec<String>> {
        let resp: OptionsResponse = self.get("/options").await?;
        Ok(resp.candidates)
    }

    pub async fn server_time(&self) -> Result<ServerTimeResponse> {
        self.get("/time").await
    }

    pub async fn vote(
        &self,
        session_id: &str,
        candidate: &str,
        timestamp: u64,
        click_time: f64,
    ) -> Result<VoteResponse> {
        self.post(
            "/vote",
            &VoteRequestBody {
                session_id: session_id.to_string(),
                candidate: candidate.to_string(),
                timestamp,
                click_time,
            },
        )
        .await
    }

    pub async fn vote_outcome(&self, request_id: u64) -> Result<VoteOutcome> {
        let resp: VoteOutcomeResponse = self.get(&format!("/vote/{}", request_id)).await?;
        Ok(resp.outcome)
    }

    /// Poll until the request leaves `Pending` or `timeout` elapses.
    pub async fn wait_for_outcome(&self, request_id: u64, timeout: Duration) -> Result<VoteOutcome> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let outcome = self.vote_outcome(request_id).await?;
            if outcome != VoteOutcome::Pending || tokio::time::Instant::now() >= deadline {
                return Ok(outcome);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    pub async fn status(&self) -> Result<VotingStatusResponse> {
        self.get("/status").await
    }

    pub async fn voters(&self) -> Result<VoterDatabaseResponse> {
        self.get("/admin/voters").await
    }

    pub async fn notifications(&self) -> Result<NotificationsResponse> {
        self.get("/notifications").await
    }

    pub async fn set_timer(&self, end_time: f64) -> Result<AckResponse> {
        self.post("/admin/timer", &SetTimerRequest { end_time }).await
    }

    pub async fn start_vote(&self) -> Result<AckResponse> {
        self.post("/admin/start", &serde_json::json!({})).await
    }

    pub async fn stop_vote(&self) -> Result<AckResponse> {
        self.post("/admin/stop", &serde_json::json!({})).await
    }

    pub async fn publish_results(&self) -> Result<PublishResponse> {
        self.post("/admin/publish", &serde_json::json!({})).await
    }
}
