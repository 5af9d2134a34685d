/*!
 * Cached Value Cell
 *
 * A concurrency-safe container for the latest version of a computed value,
 * kept fresh by a background Tokio task that re-runs a caller-supplied
 * producer on a fixed interval.
 *
 * # Concurrency Contract
 *
 * - `get` is lock-free and safe under any number of concurrent callers,
 *   including while `enable`/`disable` are in flight.
 * - `enable` and `disable` are idempotent; any number of concurrent callers
 *   of either (or both) collapse to a single state transition. The
 *   cancellation-handle mutex is held across the enabled-flag swap, so even
 *   racing enable/disable calls observe a consistent flag/handle pair.
 * - At most one refresh task is alive per cell at any time. The producer is
 *   never invoked concurrently with itself.
 *
 * `disable` only requests cessation: it does not await the task, and a tick
 * that is already due may store one more value after `disable` returns.
 */

use super::config::RefreshConfig;
use super::task::run_refresh_loop;
use arc_swap::ArcSwap;
use log::{info, warn};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Producer invoked on each refresh tick. `None` means the tick is skipped
/// and the previous value retained.
pub(crate) type Source<T> = Box<dyn Fn() -> Option<T> + Send + Sync>;

/// State shared between the cell's handles and its refresh task.
pub(crate) struct Shared<T> {
    /// Current value; every store fully replaces the previous one
    pub(crate) value: ArcSwap<T>,
    /// True iff exactly one refresh task is alive for this cell
    pub(crate) enabled: AtomicBool,
    /// Caller-supplied producer, run only by the refresh task
    pub(crate) source: Source<T>,
    /// Cancellation handle for the live task; present iff enabled
    pub(crate) cancel: Mutex<Option<oneshot::Sender<()>>>,
    /// Interval between refresh ticks
    pub(crate) period: Duration,
}

/// A self-refreshing cached value.
///
/// Holds the latest output of a zero-argument producer, re-run every
/// [`RefreshConfig::period`] by a background task. Construction auto-enables
/// the refresh; [`disable`](Self::disable) and [`enable`](Self::enable)
/// stop and restart it at runtime.
///
/// Clones share the same cell and the same task. The task exits on its own
/// once every handle has been dropped.
///
/// Must be constructed within a Tokio runtime.
///
/// # Example
///
/// ```no_run
/// use refresh_cache::CachedValue;
///
/// # async fn example() {
/// let cell = CachedValue::new(42, || 100);
/// assert_eq!(*cell.get(), 42); // first tick hasn't fired yet
///
/// cell.disable(); // stop refreshing
/// cell.enable();  // resume
/// # }
/// ```
pub struct CachedValue<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + Sync + 'static> CachedValue<T> {
    /// Create a cell holding `initial`, refreshed every second by `refresh`.
    ///
    /// The cell starts enabled: a background task is already running when
    /// this returns. `get` keeps returning `initial` until the first tick
    /// fires, one period after construction.
    pub fn new<F>(initial: T, refresh: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_config(initial, refresh, RefreshConfig::default())
    }

    /// Create a cell with a custom refresh period.
    pub fn with_config<F>(initial: T, refresh: F, config: RefreshConfig) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(initial, Box::new(move || Some(refresh())), config)
    }

    /// Create a cell whose producer can fail.
    ///
    /// On `Err` the tick's store is skipped (the previous value is retained,
    /// and the error logged at warn level) and the refresh loop continues.
    /// A failed refresh never terminates the background task.
    pub fn new_fallible<E, F>(initial: T, refresh: F, config: RefreshConfig) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        let source = Box::new(move || match refresh() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("refresh failed, keeping previous value: {}", e);
                None
            }
        });
        Self::build(initial, source, config)
    }

    fn build(initial: T, source: Source<T>, config: RefreshConfig) -> Self {
        let cell = Self {
            shared: Arc::new(Shared {
                value: ArcSwap::from_pointee(initial),
                enabled: AtomicBool::new(false),
                source,
                cancel: Mutex::new(None),
                period: config.period,
            }),
        };
        cell.enable();
        cell
    }

    /// Load the current value.
    ///
    /// Lock-free atomic pointer load; never blocks on the refresh task.
    /// Returns whatever was most recently stored: the constructor's initial
    /// value, or the latest producer output.
    #[inline]
    pub fn get(&self) -> Arc<T> {
        self.shared.value.load_full()
    }

    /// Load and clone the current value.
    #[inline]
    pub fn get_cloned(&self) -> T
    where
        T: Clone,
    {
        (**self.shared.value.load()).clone()
    }

    /// Turn on automatic refresh.
    ///
    /// Idempotent: the first caller to observe the cell disabled spawns
    /// exactly one refresh task; every other concurrent caller is a no-op.
    pub fn enable(&self) {
        // Hold the handle lock across the flag swap so a racing disable
        // always finds the sender this call stores.
        let mut cancel = self.shared.cancel.lock();
        if self.shared.enabled.swap(true, Ordering::AcqRel) {
            return; // Already enabled.
        }

        // Fresh channel per enable cycle: a stale sender from a prior
        // disable can never stop this task.
        let (stop_tx, stop_rx) = oneshot::channel();
        *cancel = Some(stop_tx);

        let period = self.shared.period;
        tokio::spawn(run_refresh_loop(
            Arc::downgrade(&self.shared),
            stop_rx,
            period,
        ));

        info!("refresh task spawned ({:?} period)", period);
    }

    /// Turn off automatic refresh.
    ///
    /// Idempotent. Signals the live task to stop and returns without
    /// awaiting it; the task exits at its next wait-cycle boundary, so a
    /// tick that is already due may still store one more value.
    pub fn disable(&self) {
        let mut cancel = self.shared.cancel.lock();
        if !self.shared.enabled.swap(false, Ordering::AcqRel) {
            return; // Already disabled.
        }

        match cancel.take() {
            // Dropping the sender resolves the task's cancellation arm.
            Some(stop_tx) => drop(stop_tx),
            None => unreachable!("enabled CachedValue must hold a cancellation sender"),
        }

        info!("refresh task cancellation requested");
    }

    /// Whether a background refresh task is currently running.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Relaxed)
    }
}

impl<T> Clone for CachedValue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CachedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.shared.value.load();
        f.debug_struct("CachedValue")
            .field("value", &**value)
            .field("enabled", &self.shared.enabled.load(Ordering::Relaxed))
            .field("period", &self.shared.period)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn test_starts_enabled_with_initial_value() {
        let cell = CachedValue::new(42, || 100);

        assert_eq!(*cell.get(), 42);
        assert!(cell.is_enabled());
    }

    #[tokio::test]
    async fn test_enable_disable_idempotent() {
        let cell = CachedValue::new(0u64, || 1);

        cell.enable();
        cell.enable();
        assert!(cell.is_enabled());

        cell.disable();
        assert!(!cell.is_enabled());
        cell.disable();
        assert!(!cell.is_enabled());

        cell.enable();
        assert!(cell.is_enabled());

        cell.disable();
    }

    #[tokio::test]
    async fn test_clones_share_cell_and_state() {
        let cell = CachedValue::new(String::from("a"), || String::from("b"));
        let other = cell.clone();

        assert!(Arc::ptr_eq(&cell.get(), &other.get()));

        other.disable();
        assert!(!cell.is_enabled());
    }

    #[tokio::test]
    async fn test_get_cloned() {
        let cell = CachedValue::new(vec![1, 2, 3], Vec::new);
        assert_eq!(cell.get_cloned(), vec![1, 2, 3]);
        cell.disable();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_retains_previous_value() {
        static ATTEMPTS: AtomicU32 = AtomicU32::new(0);

        let cell = CachedValue::new_fallible(
            7u32,
            || -> Result<u32, String> {
                ATTEMPTS.fetch_add(1, Ordering::SeqCst);
                Err("source unavailable".into())
            },
            RefreshConfig::with_period(Duration::from_millis(10)),
        );

        tokio::time::sleep(Duration::from_millis(35)).await;

        // Several ticks fired, none replaced the value, and the loop kept going.
        assert!(ATTEMPTS.load(Ordering::SeqCst) >= 2);
        assert_eq!(*cell.get(), 7);
        cell.disable();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallible_recovers_after_error() {
        static ATTEMPTS: AtomicU32 = AtomicU32::new(0);

        let cell = CachedValue::new_fallible(
            0u32,
            || -> Result<u32, String> {
                let attempt = ATTEMPTS.fetch_add(1, Ordering::SeqCst);
                if attempt == 0 {
                    Err("transient".into())
                } else {
                    Ok(99)
                }
            },
            RefreshConfig::with_period(Duration::from_millis(10)),
        );

        tokio::time::sleep(Duration::from_millis(12)).await;
        assert_eq!(*cell.get(), 0); // first tick failed

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*cell.get(), 99); // second tick recovered
        cell.disable();
    }
}
