//! Coordinator and replicas over real HTTP on loopback

use minivote::common::{CoordinatorConfig, QuorumPolicy};
use minivote::coordinator::http::create_router;
use minivote::coordinator::queue::VoteOutcome;
use minivote::replica::{http as replica_http, ReplicaStore};
use minivote::{Coordinator, CoordinatorClient, Error};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn spawn_replica() -> (String, Arc<ReplicaStore>) {
    let store = Arc::new(ReplicaStore::new(&minivote::common::config::default_voters()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = replica_http::create_router(Arc::clone(&store));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}", addr), store)
}

async fn spawn_coordinator(
    replicas: Vec<String>,
    quorum: QuorumPolicy,
) -> (Arc<Coordinator>, CoordinatorClient) {
    let config = CoordinatorConfig {
        replicas,
        quorum,
        replication_timeout_ms: 500,
        scheduler_poll_ceiling_ms: 20,
        ..Default::default()
    };
    let coord = Arc::new(Coordinator::with_http_replicas(config).unwrap());
    coord.start();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(Arc::clone(&coord));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (coord, CoordinatorClient::new(format!("http://{}", addr)))
}

#[tokio::test]
async fn test_vote_reaches_every_replica() {
    let (url_a, replica_a) = spawn_replica().await;
    let (url_b, replica_b) = spawn_replica().await;
    let (coord, client) = spawn_coordinator(vec![url_a, url_b], QuorumPolicy::AnyAck).await;

    client.start_vote().await.unwrap();
    let login = client.login("Alice", 1).await.unwrap();
    assert!(!login.has_voted);

    let time = client.server_time().await.unwrap();
    let queued = client
        .vote(&login.session_id, "Candidate A", time.lamport_clock, time.server_time)
        .await
        .unwrap();
    assert!(queued.queued);

    let outcome = client
        .wait_for_outcome(queued.request_id, Duration::from_secs(5))
        .await
        .unwrap();
    assert!(outcome.is_committed(), "unexpected outcome {:?}", outcome);

    for replica in [&replica_a, &replica_b] {
        let alice = &replica.voters()[0];
        assert!(alice.has_voted);
        assert_eq!(alice.chosen_candidate.as_deref(), Some("Candidate A"));
        assert!(replica.phase().voting_active);
    }

    let err = client
        .vote(&login.session_id, "Candidate B", time.lamport_clock + 1, time.server_time)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Remote { ref reason, .. } if reason == "AlreadyVoted"));

    coord.shutdown().await;
}

#[tokio::test]
async fn test_registration_replicated() {
    let (url, replica) = spawn_replica().await;
    let (coord, client) = spawn_coordinator(vec![url], QuorumPolicy::Majority).await;

    let resp = client.register("Zoe").await.unwrap();
    assert_eq!(resp.id, 11);
    assert!(replica.voters().iter().any(|v| v.id == 11 && v.name == "Zoe"));

    let again = client.register("Zoe").await.unwrap();
    assert_eq!(again.id, 11);
    assert_eq!(again.message, "Voter already registered");
    coord.shutdown().await;
}

#[tokio::test]
async fn test_one_replica_down() {
    let (live, _replica) = spawn_replica().await;
    // Nothing listens on the discard port.
    let dead = "http://127.0.0.1:9".to_string();

    // AnyAck: one acknowledgement is enough.
    let (coord, client) =
        spawn_coordinator(vec![live.clone(), dead.clone()], QuorumPolicy::AnyAck).await;
    client.start_vote().await.unwrap();
    let login = client.login("Bob", 2).await.unwrap();
    let queued = client
        .vote(&login.session_id, "Candidate B", 1, 0.0)
        .await
        .unwrap();
    let outcome = client
        .wait_for_outcome(queued.request_id, Duration::from_secs(5))
        .await
        .unwrap();
    assert!(outcome.is_committed());
    coord.shutdown().await;

    // Majority of two needs both: the vote is rolled back.
    let (coord, client) = spawn_coordinator(vec![live, dead], QuorumPolicy::Majority).await;
    client.start_vote().await.unwrap();
    let login = client.login("Charlie", 3).await.unwrap();
    let queued = client
        .vote(&login.session_id, "Candidate C", 1, 0.0)
        .await
        .unwrap();
    let outcome = client
        .wait_for_outcome(queued.request_id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(outcome.reason(), Some("ReplicationFailed"));
    assert_ne!(outcome, VoteOutcome::Pending);

    let voters = client.voters().await.unwrap().voters;
    assert!(!voters.iter().any(|v| v.id == 3 && v.has_voted));
    coord.shutdown().await;
}

#[tokio::test]
async fn test_admin_flow_over_http() {
    let (url, replica) = spawn_replica().await;
    let (coord, client) = spawn_coordinator(vec![url], QuorumPolicy::AnyAck).await;

    client.set_timer(4_000_000_000.0).await.unwrap();
    client.start_vote().await.unwrap();

    let err = client.publish_results().await.unwrap_err();
    assert!(matches!(err, Error::Remote { ref reason, .. } if reason == "VotingStillActive"));

    client.stop_vote().await.unwrap();
    let published = client.publish_results().await.unwrap();
    assert_eq!(published.total_votes, 0);

    let status = client.status().await.unwrap();
    assert!(!status.voting_active);
    assert!(status.results_published);
    assert_eq!(status.deadline, Some(4_000_000_000.0));

    let phase = replica.phase();
    assert!(phase.results_published);
    assert_eq!(phase.deadline, Some(4_000_000_000.0));

    let notes = client.notifications().await.unwrap().notifications;
    assert!(notes.iter().any(|n| n.message == "Voting started"));
    coord.shutdown().await;
}
