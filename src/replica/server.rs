//! Replica server

use std::sync::Arc;

use crate::common::{ReplicaConfig, Result};
use crate::replica::http::create_router;
use crate::replica::store::ReplicaStore;

pub struct ReplicaServer {
    config: ReplicaConfig,
    store: Arc<ReplicaStore>,
}

impl ReplicaServer {
    pub fn new(config: ReplicaConfig) -> Self {
        let store = Arc::new(ReplicaStore::new(&config.voters));
        Self { config, store }
    }

    pub fn store(&self) -> Arc<ReplicaStore> {
        Arc::clone(&self.store)
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting replica");
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Roster: {} voters", self.config.voters.len());

        let router = create_router(self.store);
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!("✓ Replica ready");

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down replica...");
            })
            .await?;
        Ok(())
    }
}
