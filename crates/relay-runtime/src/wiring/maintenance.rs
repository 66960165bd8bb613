//! Periodic maintenance tasks.

use relay_core::RelayApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Run `job` every `period` until shutdown is signalled.
///
/// The first run happens one full period after spawning.
pub fn spawn_periodic<F>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("[maintenance] Running {}", name);
                    job();
                }
                _ = shutdown.changed() => {
                    info!("[maintenance] {} stopped", name);
                    break;
                }
            }
        }
    })
}

/// Spam decay and cache expiry for `relay`.
pub fn spawn_maintenance<R>(
    relay: Arc<R>,
    spam_interval: Duration,
    expire_interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>>
where
    R: RelayApi + 'static,
{
    let decay_relay = Arc::clone(&relay);
    let decay = spawn_periodic("spam decay", spam_interval, shutdown.clone(), move || {
        decay_relay.decay_scores();
    });

    let expire = spawn_periodic("cache expiry", expire_interval, shutdown, move || {
        let evicted = relay.expire_cache();
        if evicted > 0 {
            info!("[maintenance] Evicted {} expired messages", evicted);
        }
    });

    vec![decay, expire]
}
