//! CLI for voters and election administrators

use clap::{Parser, Subcommand};
use minivote::common::{format_unix_time, unix_time_now};
use minivote::coordinator::queue::VoteOutcome;
use minivote::CoordinatorClient;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "minivote")]
#[command(about = "minivote distributed voting CLI")]
#[command(version)]
struct Cli {
    /// Coordinator URL
    #[arg(long, default_value = "http://localhost:8000")]
    coordinator: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a voter (idempotent by name)
    Register {
        name: String,
    },

    /// Log in and print a session id
    Login {
        name: String,
        voter_id: u64,
    },

    /// List ballot options
    Options,

    /// Show server wall clock and Lamport time
    Time,

    /// Log in, cast a vote, and wait for the outcome
    Vote {
        name: String,
        voter_id: u64,
        candidate: String,

        /// Logical timestamp (defaults to the coordinator's Lamport time)
        #[arg(long)]
        timestamp: Option<u64>,

        /// Return once queued instead of waiting for the outcome
        #[arg(long)]
        no_wait: bool,

        /// Seconds to wait for the outcome
        #[arg(long, default_value = "10")]
        wait_secs: u64,
    },

    /// Show the outcome of a submitted vote
    Outcome {
        request_id: u64,
    },

    /// Election phase, queue length and votes in flight
    Status,

    /// Dump the voter database
    Voters,

    /// Recent notifications
    Notifications,

    /// Open voting
    Start,

    /// Close voting
    Stop,

    /// Set the voting deadline
    Timer {
        /// Minutes from now
        #[arg(long, conflicts_with = "at")]
        minutes: Option<f64>,

        /// Absolute Unix time in seconds
        #[arg(long)]
        at: Option<f64>,
    },

    /// Publish results (voting must be stopped)
    Publish,
}

fn print_outcome(request_id: u64, outcome: &VoteOutcome) {
    match outcome {
        VoteOutcome::Pending => println!("Request {}: still pending", request_id),
        VoteOutcome::Committed {
            voter_id,
            candidate,
        } => println!(
            "Request {}: vote committed (voter {} -> {})",
            request_id, voter_id, candidate
        ),
        VoteOutcome::Rejected { reason, message } => {
            println!("Request {}: rejected ({}): {}", request_id, reason, message)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let client = CoordinatorClient::new(&cli.coordinator);

    match cli.command {
        Commands::Register { name } => {
            let resp = client.register(&name).await?;
            println!("{} (ID: {})", resp.message, resp.id);
        }

        Commands::Login { name, voter_id } => {
            let resp = client.login(&name, voter_id).await?;
            println!("{}", resp.message);
            println!("  Session: {}", resp.session_id);
            println!("  Has voted: {}", resp.has_voted);
        }

        Commands::Options => {
            for (i, candidate) in client.options().await?.iter().enumerate() {
                println!("{:>2}. {}", i + 1, candidate);
            }
        }

        Commands::Time => {
            let resp = client.server_time().await?;
            println!("Server time: {}", format_unix_time(resp.server_time));
            println!("Lamport clock: {}", resp.lamport_clock);
        }

        Commands::Vote {
            name,
            voter_id,
            candidate,
            timestamp,
            no_wait,
            wait_secs,
        } => {
            let login = client.login(&name, voter_id).await?;
            if login.has_voted {
                anyhow::bail!("{} has already voted", name);
            }
            let timestamp = match timestamp {
                Some(ts) => ts,
                None => client.server_time().await?.lamport_clock,
            };
            let resp = client
                .vote(&login.session_id, &candidate, timestamp, unix_time_now())
                .await?;
            println!("{} (request {})", resp.message, resp.request_id);

            if !no_wait {
                let outcome = client
                    .wait_for_outcome(resp.request_id, Duration::from_secs(wait_secs))
                    .await?;
                print_outcome(resp.request_id, &outcome);
            }
        }

        Commands::Outcome { request_id } => {
            let outcome = client.vote_outcome(request_id).await?;
            print_outcome(request_id, &outcome);
        }

        Commands::Status => {
            let status = client.status().await?;
            println!("Voting status:");
            println!("  Active: {}", status.voting_active);
            match status.deadline {
                Some(deadline) => println!("  Deadline: {}", format_unix_time(deadline)),
                None => println!("  Deadline: none"),
            }
            println!("  Results published: {}", status.results_published);
            println!("  Queue length: {}", status.queue_length);
            println!("  In flight: {}", status.in_flight);
            println!("  Lamport clock: {}", status.lamport_clock);
        }

        Commands::Voters => {
            for voter in client.voters().await?.voters {
                let ballot = match (&voter.chosen_candidate, voter.has_voted) {
                    (Some(candidate), true) => candidate.as_str(),
                    _ => "-",
                };
                println!("{:>4}  {:<12} {}", voter.id, voter.name, ballot);
            }
        }

        Commands::Notifications => {
            for n in client.notifications().await?.notifications {
                println!("[{}] {}", n.timestamp.to_rfc3339(), n.message);
            }
        }

        Commands::Start => println!("{}", client.start_vote().await?.message),

        Commands::Stop => println!("{}", client.stop_vote().await?.message),

        Commands::Timer { minutes, at } => {
            let end_time = match (minutes, at) {
                (_, Some(at)) => at,
                (Some(minutes), None) => unix_time_now() + minutes * 60.0,
                (None, None) => anyhow::bail!("pass --minutes or --at"),
            };
            client.set_timer(end_time).await?;
            println!("Voting deadline set to {}", format_unix_time(end_time));
        }

        Commands::Publish => {
            let resp = client.publish_results().await?;
            println!("Results ({} votes):", resp.total_votes);
            for tally in resp.results {
                println!("  {:<14} {}", tally.candidate, tally.votes);
            }
        }
    }

    Ok(())
}
