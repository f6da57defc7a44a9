use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::actors::{BookingStore, Directory};
use crate::clients::{DirectoryClient, StoreClient};
use crate::dispatch::{DispatchClient, DispatchFabric};
use crate::engine::NegotiationEngine;

/// The main application system that wires the actors together.
///
/// Responsible for starting the store, directory and dispatch fabric,
/// injecting the dispatch port into the negotiation engine, and handling
/// shutdown.
pub struct BookingSystem {
    pub engine: NegotiationEngine,
    pub store_client: StoreClient,
    pub directory_client: DirectoryClient,
    pub dispatch_client: DispatchClient,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl BookingSystem {
    pub fn new() -> Self {
        let (store, store_client) = BookingStore::new(32, || Uuid::new_v4().to_string());
        let store_handle = tokio::spawn(store.run());

        let (directory, directory_client) = Directory::new(32);
        let directory_handle = tokio::spawn(directory.run());

        let (fabric, dispatch_client) = DispatchFabric::new(32);
        let fabric_handle = tokio::spawn(fabric.run());

        let engine = NegotiationEngine::new(
            store_client.clone(),
            directory_client.clone(),
            Arc::new(dispatch_client.clone()),
        );

        Self {
            engine,
            store_client,
            directory_client,
            dispatch_client,
            handles: vec![store_handle, directory_handle, fabric_handle],
        }
    }

    /// Graceful shutdown: dropping every client closes the actors' channels,
    /// which ends their run loops.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");

        drop(self.engine);
        drop(self.store_client);
        drop(self.directory_client);
        drop(self.dispatch_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(format!("Actor task failed: {:?}", e));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}

impl Default for BookingSystem {
    fn default() -> Self {
        Self::new()
    }
}
