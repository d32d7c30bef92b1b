//! Storage node server

use crate::common::{MemoryBackend, NodeBackend, NodeConfig, Result};
use crate::node::collection::FileCollection;
use crate::node::http::{create_router, CollectionState};
use std::sync::Arc;

pub struct NodeServer {
    config: NodeConfig,
    node_id: String,
}

impl NodeServer {
    pub fn new(config: NodeConfig, node_id: String) -> Self {
        Self { config, node_id }
    }

    /// Open the configured collection, bind and serve until Ctrl-C.
    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting storage node: {}", self.node_id);
        tracing::info!("  HTTP API: {}", self.config.bind_addr);

        let collection: Arc<dyn NodeBackend> = match &self.config.data_dir {
            Some(dir) => {
                tracing::info!("  Data path: {}", dir.display());
                tracing::info!("  Log sync: {:?}", self.config.sync);
                let dir = dir.clone();
                let sync = self.config.sync;
                Arc::new(
                    tokio::task::spawn_blocking(move || FileCollection::open_with(dir, sync))
                        .await
                        .map_err(|e| crate::Error::Internal(e.to_string()))??,
                )
            }
            None => {
                tracing::info!("  Data path: none (in-memory collection)");
                Arc::new(MemoryBackend::new(self.node_id.clone()))
            }
        };

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        let result = serve_on(listener, collection.clone(), self.node_id.clone()).await;

        if let Err(e) = collection.close() {
            tracing::error!("Failed to close collection: {}", e);
        }
        result
    }
}

/// Serve `collection` on an already bound listener until Ctrl-C.
pub async fn serve_on(
    listener: tokio::net::TcpListener,
    collection: Arc<dyn NodeBackend>,
    node_id: String,
) -> Result<()> {
    let router = create_router(CollectionState {
        collection,
        node_id: node_id.clone(),
    });

    tracing::info!("✓ Storage node {} ready on {}", node_id, listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Storage node {} stopped", node_id);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
