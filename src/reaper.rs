//! Background reclamation of inactive sessions.
//!
//! A single task started at process init sweeps the session store on a fixed interval
//! and deletes sessions whose directory has not been touched within the TTL. The task
//! holds nothing beyond the store handle, the metrics registry, and its two durations.
//! It is the only component that removes sessions; queries tolerate losing the race by
//! treating a vanished session as expired.

use crate::metrics::RagMetrics;
use crate::store::{SessionStore, StoreError};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handle to the running reclamation task, used to stop it at shutdown.
pub struct ReaperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Signal the task to stop and wait for the current sweep to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Start the reclamation task.
///
/// Sweeps run every `interval`; the first sweep happens one interval after startup so a
/// freshly restarted process does not race its own initialization.
pub fn spawn(
    store: Arc<SessionStore>,
    metrics: Arc<RagMetrics>,
    ttl: Duration,
    interval: Duration,
) -> ReaperHandle {
    let (shutdown, mut stop_rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // the first tick completes immediately

        tracing::info!(
            ttl_secs = ttl.as_secs(),
            interval_secs = interval.as_secs(),
            "Session reclamation task started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let reclaimed = sweep(&store, ttl);
                    if reclaimed > 0 {
                        metrics.record_reclaimed(reclaimed as u64);
                    }
                }
                _ = stop_rx.changed() => {
                    tracing::info!("Session reclamation task stopping");
                    break;
                }
            }
        }
    });

    ReaperHandle { shutdown, task }
}

/// Delete every session whose directory mtime is older than `ttl`.
///
/// Best-effort: a candidate that fails to stat or delete (typically because a
/// concurrent sweep already removed it) is logged and skipped, never fatal to the
/// caller. Returns the number of sessions removed.
pub fn sweep(store: &SessionStore, ttl: Duration) -> usize {
    let ids = match store.list_session_ids() {
        Ok(ids) => ids,
        Err(err) => {
            tracing::warn!(error = %err, "Reclamation sweep could not enumerate sessions");
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut reclaimed = 0usize;

    for id in ids {
        let modified = match store.last_modified(&id) {
            Ok(modified) => modified,
            Err(StoreError::NotFound(_)) => continue,
            Err(err) => {
                tracing::warn!(session_id = %id, error = %err, "Skipping unreadable session");
                continue;
            }
        };

        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age <= ttl {
            continue;
        }

        match store.delete(&id) {
            Ok(()) => {
                tracing::info!(session_id = %id, age_secs = age.as_secs(), "Session reclaimed");
                reclaimed += 1;
            }
            Err(err) => {
                tracing::warn!(session_id = %id, error = %err, "Failed to reclaim session");
            }
        }
    }

    reclaimed
}
