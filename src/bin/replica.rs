//! Replica binary

use clap::{Parser, Subcommand};
use minivote::common::Config;
use minivote::ReplicaServer;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minivote-replica")]
#[command(about = "minivote replica: mirrors the coordinator's voter database")]
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
    /// Start replica server
    Serve {
        /// Bind address for HTTP
        #[arg(long)]
        bind: Option<String>,
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
        Commands::Serve { bind } => {
            let mut replica_config = config.replica.unwrap_or_default();
            if let Some(bind) = bind {
                replica_config.bind_addr = bind.parse()?;
            }
            ReplicaServer::new(replica_config).serve().await?;
        }
    }

    Ok(())
}
