//! Background eviction of idle carts.
//!
//! A [`Sweeper`] runs one pass per tick: it reads the clock once, snapshots
//! the carts that look idle, and then re-validates each of them under the
//! cart's own guard before removing it. A cart touched between the snapshot
//! and its removal survives.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::EvictionError;
use crate::model::Cart;
use crate::store::CartStore;

/// Smallest tick period the background task will use.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Hook called once for every evicted cart.
pub trait EvictionListener: Send + Sync {
    /// Called after `cart` has been removed from the store.
    ///
    /// Errors and panics are logged and counted. Neither stops the sweep
    /// or brings the cart back.
    fn on_evict(&self, cart: &Cart) -> Result<(), EvictionError>;
}

/// Listener that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl EvictionListener for NoopListener {
    fn on_evict(&self, _cart: &Cart) -> Result<(), EvictionError> {
        Ok(())
    }
}

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Carts that looked idle in the snapshot.
    pub candidates: usize,

    /// Carts actually removed.
    pub evicted: usize,

    /// Candidates that were refreshed or deleted before their removal.
    pub skipped: usize,

    /// Evictions whose listener returned an error or panicked.
    pub failed: usize,
}

/// Evicts carts idle longer than the store's idle timeout.
#[derive(Clone)]
pub struct Sweeper {
    store: CartStore,
    listener: Arc<dyn EvictionListener>,
}

impl Sweeper {
    /// Create a sweeper for `store` with no eviction listener.
    pub fn new(store: CartStore) -> Self {
        Self {
            store,
            listener: Arc::new(NoopListener),
        }
    }

    /// Attach a listener that is told about every eviction.
    pub fn with_listener(mut self, listener: Arc<dyn EvictionListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Run a single pass over the store.
    pub fn sweep_once(&self) -> SweepReport {
        let now = self.store.clock().now();
        let candidates = self.store.idle_candidates(now);

        let mut report = SweepReport {
            candidates: candidates.len(),
            ..SweepReport::default()
        };

        for cart_id in candidates {
            let Some(cart) = self.store.evict_if_idle(cart_id, now) else {
                debug!(cart_id = %cart_id, "Cart refreshed or removed before eviction, skipping");
                report.skipped += 1;
                continue;
            };

            report.evicted += 1;
            info!(
                cart_id = %cart_id,
                last_accessed = %cart.last_accessed,
                items = cart.items.len(),
                "Evicted inactive cart"
            );

            match catch_unwind(AssertUnwindSafe(|| self.listener.on_evict(&cart))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(cart_id = %cart_id, error = %e, "Eviction listener failed");
                }
                Err(panic) => {
                    report.failed += 1;
                    error!(
                        cart_id = %cart_id,
                        panic = panic_message(panic.as_ref()),
                        "Eviction listener panicked"
                    );
                }
            }
        }

        if report.candidates > 0 {
            debug!(
                candidates = report.candidates,
                evicted = report.evicted,
                skipped = report.skipped,
                failed = report.failed,
                "Sweep pass finished"
            );
        }

        report
    }

    /// Start the periodic sweep on the current tokio runtime.
    ///
    /// The first pass runs one full interval after the call. The task runs
    /// until the returned handle is cancelled or shut down.
    pub fn spawn(self) -> SweeperHandle {
        let cancel = CancellationToken::new();
        let join = tokio::spawn(self.run(cancel.clone()));
        SweeperHandle { cancel, join }
    }

    async fn run(self, cancel: CancellationToken) {
        let period = self.store.config().sweep_interval.max(MIN_SWEEP_INTERVAL);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        info!(
            interval = ?period,
            idle_timeout = ?self.store.config().idle_timeout,
            "Cart sweeper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let sweeper = self.clone();
            // A panic inside a pass is confined to that pass.
            if let Err(e) = tokio::task::spawn_blocking(move || sweeper.sweep_once()).await {
                error!(error = %e, "Sweep pass aborted, retrying on next tick");
            }
        }

        info!("Cart sweeper stopped");
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Handle to a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop after any in-flight pass.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check whether the sweeper task has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            warn!(error = %e, "Cart sweeper task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::config::StoreConfig;
    use crate::error::CartError;
    use crate::model::{CartId, Item};
    use chrono::TimeDelta;
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use tokio::time::sleep;

    fn test_store(sweep_interval: Duration) -> (CartStore, ManualClock) {
        let clock = ManualClock::starting_now();
        let config = StoreConfig::new()
            .with_idle_timeout(Duration::from_secs(600))
            .with_sweep_interval(sweep_interval);
        (CartStore::with_clock(config, clock.clone()), clock)
    }

    /// Records evicted ids, failing for one chosen cart.
    #[derive(Default)]
    struct RecordingListener {
        evicted: Mutex<Vec<CartId>>,
        fail_for: Option<CartId>,
    }

    impl EvictionListener for RecordingListener {
        fn on_evict(&self, cart: &Cart) -> Result<(), EvictionError> {
            self.evicted.lock().push(cart.id);
            if self.fail_for == Some(cart.id) {
                return Err(EvictionError::new("archive unavailable"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_sweep_evicts_only_stale_carts() {
        let (store, clock) = test_store(Duration::from_secs(60));
        let stale = store.create();
        clock.advance(TimeDelta::minutes(8));
        let fresh = store.create();
        clock.advance(TimeDelta::minutes(3));

        let report = Sweeper::new(store.clone()).sweep_once();

        assert_eq!(
            report,
            SweepReport {
                candidates: 1,
                evicted: 1,
                skipped: 0,
                failed: 0,
            }
        );
        assert_eq!(store.get(stale.id), Err(CartError::NotFound(stale.id)));
        assert!(store.get(fresh.id).is_ok());
    }

    #[test]
    fn test_untouched_cart_gone_after_eleven_minutes() {
        let (store, clock) = test_store(Duration::from_secs(60));
        let cart = store.create();

        clock.advance(TimeDelta::minutes(11));
        Sweeper::new(store.clone()).sweep_once();

        assert_eq!(store.get(cart.id), Err(CartError::NotFound(cart.id)));
    }

    #[test]
    fn test_recently_accessed_cart_survives() {
        let (store, clock) = test_store(Duration::from_secs(60));
        let cart = store.create();

        clock.advance(TimeDelta::minutes(9));
        store
            .add_item(cart.id, Item::new(1, "Widget", Decimal::new(999, 2)))
            .unwrap();
        clock.advance(TimeDelta::minutes(9));

        let report = Sweeper::new(store.clone()).sweep_once();

        assert_eq!(report.evicted, 0);
        assert_eq!(store.get(cart.id).unwrap().items.len(), 1);
    }

    #[test]
    fn test_listener_failure_does_not_stop_sweep() {
        let (store, clock) = test_store(Duration::from_secs(60));
        let carts: Vec<_> = (0..4).map(|_| store.create().id).collect();
        clock.advance(TimeDelta::minutes(11));

        let listener = Arc::new(RecordingListener {
            fail_for: Some(carts[1]),
            ..Default::default()
        });
        let report = Sweeper::new(store.clone())
            .with_listener(listener.clone())
            .sweep_once();

        assert_eq!(report.evicted, 4);
        assert_eq!(report.failed, 1);
        assert!(store.is_empty());

        let mut seen = listener.evicted.lock().clone();
        let mut expected = carts.clone();
        seen.sort_by_key(|id| *id.as_uuid());
        expected.sort_by_key(|id| *id.as_uuid());
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_concurrent_reads_race_sweep_pass() {
        for _ in 0..100 {
            let (store, clock) = test_store(Duration::from_secs(60));
            let cart = store.create();
            clock.advance(TimeDelta::minutes(11));
            let sweeper = Sweeper::new(store.clone());

            let (hits, report) = std::thread::scope(|s| {
                let readers: Vec<_> = (0..4)
                    .map(|_| s.spawn(|| store.get(cart.id).is_ok() as usize))
                    .collect();
                let pass = s.spawn(|| sweeper.sweep_once());
                let hits: usize = readers.into_iter().map(|h| h.join().unwrap()).sum();
                (hits, pass.join().unwrap())
            });

            // A successful read refreshes the cart, so it can no longer be
            // removed by a pass reading the same instant.
            if report.evicted == 1 {
                assert_eq!(hits, 0);
                assert!(!store.contains(cart.id));
            } else {
                assert!(hits > 0);
                assert!(store.contains(cart.id));
            }
        }
    }

    #[test]
    fn test_empty_store_sweep() {
        let (store, _) = test_store(Duration::from_secs(60));
        assert_eq!(Sweeper::new(store).sweep_once(), SweepReport::default());
    }

    struct PanickingListener;

    impl EvictionListener for PanickingListener {
        fn on_evict(&self, _cart: &Cart) -> Result<(), EvictionError> {
            panic!("listener exploded");
        }
    }

    #[test]
    fn test_panicking_listener_still_evicts_every_stale_cart() {
        let (store, clock) = test_store(Duration::from_secs(60));
        for _ in 0..3 {
            store.create();
        }
        clock.advance(TimeDelta::minutes(11));

        let report = Sweeper::new(store.clone())
            .with_listener(Arc::new(PanickingListener))
            .sweep_once();

        assert_eq!(
            report,
            SweepReport {
                candidates: 3,
                evicted: 3,
                skipped: 0,
                failed: 3,
            }
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_spawned_sweeper_evicts_on_tick() {
        let (store, clock) = test_store(Duration::from_millis(20));
        let stale = store.create();
        clock.advance(TimeDelta::minutes(11));
        let fresh = store.create();

        let handle = Sweeper::new(store.clone()).spawn();
        sleep(Duration::from_millis(150)).await;

        assert!(!store.contains(stale.id));
        assert!(store.contains(fresh.id));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_future_ticks() {
        let (store, clock) = test_store(Duration::from_millis(20));
        let handle = Sweeper::new(store.clone()).spawn();

        handle.shutdown().await;

        let cart = store.create();
        clock.advance(TimeDelta::minutes(11));
        sleep(Duration::from_millis(100)).await;

        assert!(store.contains(cart.id));
        assert_eq!(clock.now() - cart.last_accessed, TimeDelta::minutes(11));
    }

    #[tokio::test]
    async fn test_cancel_marks_task_finished() {
        let (store, _) = test_store(Duration::from_secs(3600));
        let handle = Sweeper::new(store).spawn();

        handle.cancel();
        sleep(Duration::from_millis(50)).await;

        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_kill_sweeper() {
        let (store, clock) = test_store(Duration::from_millis(20));
        store.create();
        clock.advance(TimeDelta::minutes(11));

        let handle = Sweeper::new(store.clone())
            .with_listener(Arc::new(PanickingListener))
            .spawn();
        sleep(Duration::from_millis(100)).await;

        assert!(store.is_empty());
        assert!(!handle.is_finished());

        // Later ticks still run.
        let next = store.create();
        clock.advance(TimeDelta::minutes(11));
        sleep(Duration::from_millis(100)).await;
        assert!(!store.contains(next.id));

        handle.shutdown().await;
    }
}
