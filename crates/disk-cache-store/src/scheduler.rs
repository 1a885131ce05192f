//! Background expiry sweep.

use crate::store::DiskCacheStore;
use std::time::Duration;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Periodically runs [`DiskCacheStore::sweep_expired`] on its own task.
#[derive(Debug, Clone)]
pub struct CleanupScheduler {
    store: DiskCacheStore,
    period: Duration,
}

impl CleanupScheduler {
    #[must_use]
    pub const fn new(store: DiskCacheStore, period: Duration) -> Self {
        Self { store, period }
    }

    /// Scheduler using the store's own sweep interval (a quarter of the TTL, at least a minute).
    #[must_use]
    pub fn for_store(store: DiskCacheStore) -> Self {
        let period = store.policy().sweep_interval();
        Self::new(store, period)
    }

    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Spawn the sweep loop. The first sweep runs one full period after start.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(self) -> CleanupHandle {
        let token = CancellationToken::new();
        let task_token = token.clone();

        tracing::info!(
            "Cache cleanup scheduler started - period: {:?}, directory: {:?}",
            self.period,
            self.store.base_dir()
        );

        let task = tokio::spawn(async move { self.run(task_token).await });

        CleanupHandle { token, task }
    }

    async fn run(self, cancellation_token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // interval fires immediately once; skip it so the first sweep waits a full period
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.store.sweep_expired().await {
                        Ok(removed) => {
                            tracing::debug!(removed, "Cache cleanup sweep finished");
                        }
                        Err(e) => {
                            tracing::error!("Error during cache cleanup: {}", e);
                        }
                    }
                }
                () = cancellation_token.cancelled() => {
                    tracing::info!("Cache cleanup scheduler received cancellation signal, stopping");
                    break;
                }
            }
        }
    }
}

/// Handle to a running [`CleanupScheduler`].
#[derive(Debug)]
pub struct CleanupHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl CleanupHandle {
    /// Token that stops the loop when cancelled; useful to tie it to a wider shutdown signal.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the loop to stop and wait for it. A sweep in progress completes first.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("Cache cleanup task ended abnormally: {}", e);
        }
    }
}
