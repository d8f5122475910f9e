//! Coordinator binary

use clap::{Parser, Subcommand};
use minivote::common::{Config, QuorumPolicy};
use minivote::Coordinator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minivote-coord")]
#[command(about = "minivote coordinator: Lamport-ordered vote admission")]
#[command(version)]
struct Cli {
    /// Config file (TOML); defaults to ./minivote.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start coordinator server
    Serve {
        /// Bind address for HTTP
        #[arg(long)]
        bind: Option<String>,

        /// Replica base URLs (comma-separated)
        #[arg(long, value_delimiter = ',')]
        replicas: Option<Vec<String>>,

        /// Quorum policy: any_ack or majority
        #[arg(long)]
        quorum: Option<QuorumPolicy>,

        /// Maximum votes admitted at once
        #[arg(long)]
        max_concurrent: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let log_level = cli.log_level.unwrap_or_else(|| config.log_level.clone());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve {
            bind,
            replicas,
            quorum,
            max_concurrent,
        } => {
            // CLI arguments take priority over the config file
            let mut coord_config = config.coordinator.unwrap_or_default();
            if let Some(bind) = bind {
                coord_config.bind_addr = bind.parse()?;
            }
            if let Some(replicas) = replicas {
                coord_config.replicas = replicas;
            }
            if let Some(quorum) = quorum {
                coord_config.quorum = quorum;
            }
            if let Some(max) = max_concurrent {
                coord_config.max_concurrent_votes = max;
            }

            let coord = Arc::new(Coordinator::with_http_replicas(coord_config)?);
            coord.serve().await?;
        }
    }

    Ok(())
}
