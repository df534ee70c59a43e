//! Sweep Ticker
//!
//! Background task that periodically sweeps expired entries out of every
//! open session. The engine never schedules anything itself; this is the
//! host-side timer that drives it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Clock;
use crate::host::SessionRegistry;

/// Spawns a background task that sweeps all sessions every `interval`.
///
/// The first sweep happens one full interval after the call. The returned
/// handle aborts the task during shutdown.
///
/// # Example
/// ```ignore
/// let registry = Arc::new(SessionRegistry::from_config(&config)?);
/// let ticker = spawn_sweep_task(registry.clone(), config.sweep_interval());
/// // Later, during shutdown:
/// ticker.abort();
/// ```
pub fn spawn_sweep_task(registry: Arc<SessionRegistry>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting sweep task");

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let now = registry.clock().now();
            let removed = registry.sweep_all(now);

            if removed > 0 {
                info!(removed, sessions = registry.len(), "Sweep removed expired entries");
            } else {
                debug!("Sweep found no expired entries");
            }
        }
    })
}
