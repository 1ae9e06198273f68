//! Timer-driven age sweep.
//!
//! Runs independently of request handling; reads and writes never trigger a
//! sweep themselves.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::ArtifactStore;

/// Shortest sweep period accepted; `tokio::time::interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// How long artifacts are kept and how often the store is swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Artifacts at least this old are removed.
    pub max_age: Duration,
    /// Period between sweeps.
    pub sweep_interval: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

/// Spawn the sweep loop. The first sweep runs immediately.
///
/// Abort the returned handle to stop sweeping.
pub fn spawn_sweeper<S>(store: Arc<S>, policy: RetentionPolicy) -> JoinHandle<()>
where
    S: ArtifactStore + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(policy.sweep_interval.max(MIN_SWEEP_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match store.sweep(policy.max_age).await {
                Ok(0) => debug!("sweep found nothing to remove"),
                Ok(removed) => info!(
                    target: "gerber_render::metrics",
                    metric_type = "sweep",
                    removed = removed,
                    max_age_secs = policy.max_age.as_secs(),
                    "sweep_metric"
                ),
                Err(e) => warn!(error = %e, "artifact sweep failed"),
            }
        }
    })
}
