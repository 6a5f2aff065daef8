//! Periodic eviction of stale identifiers.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::IdentifierStore;
use crate::config::StoreConfig;

/// Background task sweeping an [`IdentifierStore`] on a fixed interval.
///
/// The task holds only a weak reference and exits once the store is dropped.
/// Dropping the sweeper aborts the task.
#[derive(Debug)]
pub struct StoreSweeper {
    handle: Option<JoinHandle<()>>,
    interval: Duration,
    max_age: Duration,
}

impl StoreSweeper {
    /// Spawns the sweep loop on the current tokio runtime.
    ///
    /// The first sweep runs one full `interval` after start. A zero interval
    /// is raised to one millisecond.
    pub fn start(store: &Arc<IdentifierStore>, interval: Duration, max_age: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let store: Weak<IdentifierStore> = Arc::downgrade(store);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    tracing::debug!("Identifier store dropped, stopping sweeper");
                    break;
                };

                let removed = store.sweep(max_age);
                if removed > 0 {
                    tracing::info!(removed, remaining = store.size(), "Evicted stale identifiers");
                }
            }
        });

        tracing::debug!(?interval, ?max_age, "Started identifier sweeper");

        Self {
            handle: Some(handle),
            interval,
            max_age,
        }
    }

    /// Starts a sweeper from store configuration, or `None` when disabled.
    pub fn from_config(store: &Arc<IdentifierStore>, config: &StoreConfig) -> Option<Self> {
        config
            .enable_sweeper
            .then(|| Self::start(store, config.sweep_interval, config.max_age))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Returns true while the sweep loop is still scheduled.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the sweep loop and waits for the task to wind down.
    pub async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            // Cancellation is the expected outcome here
            let _ = handle.await;
            tracing::debug!("Stopped identifier sweeper");
        }
    }
}

impl Drop for StoreSweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};

    use super::*;

    #[tokio::test]
    async fn test_sweeper_evicts_stale_entries() {
        let store = Arc::new(IdentifierStore::new());
        let stale = store.store_at(
            "https://a.example/old",
            "A",
            "Old",
            Utc::now() - TimeDelta::hours(2),
        );
        let fresh = store.store("https://a.example/new", "A", "New");

        let sweeper = StoreSweeper::start(
            &store,
            Duration::from_millis(10),
            Duration::from_secs(3600),
        );
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(store.get_entry(&stale).is_none());
        assert!(store.get_entry(&fresh).is_some());
        assert!(sweeper.is_running());

        sweeper.stop().await;
    }

    #[tokio::test]
    async fn test_sweeper_exits_when_store_dropped() {
        let store = Arc::new(IdentifierStore::new());
        let sweeper = StoreSweeper::start(&store, Duration::from_millis(5), Duration::from_secs(1));

        drop(store);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!sweeper.is_running());
    }

    #[tokio::test]
    async fn test_disabled_config_starts_nothing() {
        let store = Arc::new(IdentifierStore::new());
        let config = StoreConfig {
            enable_sweeper: false,
            ..Default::default()
        };

        assert!(StoreSweeper::from_config(&store, &config).is_none());
    }

    #[tokio::test]
    async fn test_zero_interval_is_clamped() {
        let store = Arc::new(IdentifierStore::new());
        let sweeper = StoreSweeper::start(&store, Duration::ZERO, Duration::from_secs(1));

        assert_eq!(sweeper.interval(), Duration::from_millis(1));
        sweeper.stop().await;
    }
}
