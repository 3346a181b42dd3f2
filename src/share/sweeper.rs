//! Periodic sweeper: reclaims expired shares on a fixed interval.
//!
//! Complements the opportunistic sweep inside `ShareStore::create`, so
//! storage is reclaimed even when nobody creates new shares. Reads never
//! depend on it: expired entries are already invisible.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::store::ShareStore;

/// Handle for the background sweeper task.
///
/// Stops the task on `shutdown()` or when dropped.
pub struct SweeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Request shutdown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Request shutdown and wait for the task to finish.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawn the sweeper on the current tokio runtime.
///
/// The first sweep runs immediately, then once per `interval`.
pub fn start_sweeper(store: Arc<ShareStore>, interval: Duration) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        tracing::info!("Share sweeper started (every {}s)", interval.as_secs());
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => match store.sweep() {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!(removed, "Swept expired shares"),
                    Err(e) => tracing::error!("Share sweep failed: {e}"),
                },
            }
        }

        tracing::info!("Share sweeper stopped");
    });

    SweeperHandle {
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExamRecord;
    use crate::share::clock::ManualClock;

    #[tokio::test]
    async fn sweeps_expired_entries_in_background() {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = Arc::new(ShareStore::in_memory_with_clock(clock.clone()).unwrap());
        store.create(&ExamRecord::default(), 10).unwrap();
        let live = store.create(&ExamRecord::default(), 1_000).unwrap();

        clock.advance(20);
        let sweeper = start_sweeper(store.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        sweeper.stop().await;

        // Rewound, every row still on disk counts as live
        clock.set(0);
        assert_eq!(store.active_count().unwrap(), 1);
        assert!(store.resolve(&live.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let store = Arc::new(ShareStore::open_in_memory().unwrap());
        let mut sweeper = start_sweeper(store, Duration::from_secs(3_600));
        sweeper.shutdown();
        sweeper.shutdown();
        sweeper.stop().await;
    }
}
