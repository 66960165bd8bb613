//! # Relay Container
//!
//! Builds the adapters and the relay service from configuration and holds
//! them for the lifetime of the runtime.

pub mod config;

pub use config::{ConfigError, RuntimeConfig, DEFAULT_CONFIG_PATH};

use relay_core::adapters::{MemoryDirectory, PlainFormatter};
use relay_core::ports::{SystemTimeSource, TimeSource};
use relay_core::{RelayApi, RelayService};
use shared_types::Rank;
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::ConsoleTransport;

/// Relay service as wired by the runtime.
pub type ConsoleRelay = RelayService<ConsoleTransport, MemoryDirectory, PlainFormatter, SystemTimeSource>;

/// Service plus the adapters the console driver talks to directly.
pub struct RelayContainer {
    pub config: RuntimeConfig,
    pub relay: Arc<ConsoleRelay>,
    pub transport: Arc<ConsoleTransport>,
    pub directory: Arc<MemoryDirectory>,
    pub clock: Arc<SystemTimeSource>,
}

impl RelayContainer {
    /// Wire everything, printing to standard output.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_transport(config, ConsoleTransport::stdout())
    }

    /// Wire everything around the given transport.
    pub fn with_transport(config: RuntimeConfig, transport: ConsoleTransport) -> Self {
        let transport = Arc::new(transport);
        let directory = Arc::new(MemoryDirectory::new());
        let clock = Arc::new(SystemTimeSource);

        let relay = Arc::new(RelayService::new(
            config.relay.clone(),
            Arc::clone(&transport),
            Arc::clone(&directory),
            Arc::new(PlainFormatter),
            Arc::clone(&clock),
        ));

        let now = clock.now();
        for id in &config.members {
            directory.join(*id, now);
            relay.join(*id);
        }
        for id in &config.moderators {
            directory.join(*id, now);
            relay.join(*id);
            if let Err(e) = directory.update(*id, |profile| profile.rank = Rank::Mod) {
                warn!("Could not promote {}: {}", id, e);
            }
        }
        info!(
            "Relay wired with {} members ({} moderators)",
            relay.roster().len(),
            config.moderators.len()
        );

        Self {
            config,
            relay,
            transport,
            directory,
            clock,
        }
    }
}
