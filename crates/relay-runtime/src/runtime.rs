//! Startup and graceful shutdown of the relay.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::container::{RelayContainer, RuntimeConfig};
use crate::adapters::ConsoleTransport;
use crate::wiring::spawn_maintenance;

/// The running relay: container plus background tasks.
pub struct RelayRuntime {
    container: Arc<RelayContainer>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RelayRuntime {
    /// Wire the relay, printing deliveries to standard output.
    pub fn new(config: RuntimeConfig) -> Self {
        Self::from_container(RelayContainer::new(config))
    }

    /// Wire the relay around a given transport.
    pub fn with_transport(config: RuntimeConfig, transport: ConsoleTransport) -> Self {
        Self::from_container(RelayContainer::with_transport(config, transport))
    }

    fn from_container(container: RelayContainer) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            container: Arc::new(container),
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start maintenance tasks.
    pub fn start(&self) {
        info!("===========================================");
        info!("  Anonymous Relay v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let relay = &self.container.config.relay;
        let handles = spawn_maintenance(
            Arc::clone(&self.container.relay),
            relay.spam.interval,
            relay.cache.expire_interval,
            self.shutdown_rx.clone(),
        );
        self.tasks.lock().extend(handles);
        info!(
            "Maintenance scheduled: spam decay every {:?}, cache expiry every {:?}",
            relay.spam.interval, relay.cache.expire_interval
        );
    }

    pub fn container(&self) -> Arc<RelayContainer> {
        Arc::clone(&self.container)
    }

    /// Receiver that flips to `true` on shutdown.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Stop maintenance, finish queued deliveries, stop the workers.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                error!("Maintenance task ended abnormally: {}", e);
            }
        }

        self.container.relay.shutdown().await;
        info!("Shutdown complete");
    }
}
