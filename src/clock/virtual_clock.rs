//! # Manually advanced clock for deterministic tests.
//!
//! [`VirtualClock`] implements [`Clock`] without ever touching the tokio
//! timer. Sleeping tasks park on a oneshot wakeup registered under a virtual
//! deadline; nothing moves until the test calls [`VirtualClock::advance`].
//!
//! ## Rules
//! - `advance(d)` moves virtual time *through* every due deadline in order,
//!   not past it in one jump: sleepers woken mid-advance get to run and
//!   register follow-up sleeps, which fire within the same `advance` call if
//!   they still land inside the window. A producer looping on `sleep(1s)`
//!   therefore ticks three times during `advance(3s)`.
//! - Wakeups at the same deadline fire in registration order.
//! - `run_pending()` lets already-runnable tasks make progress without moving
//!   time. The drain is a bounded number of cooperative yields, so a test can
//!   never hang on a task that keeps itself busy.
//! - `sleep(0)` yields once and returns without registering a deadline.
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use streamvisor::{Clock, VirtualClock};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let clock = Arc::new(VirtualClock::new());
//! let waiter = {
//!     let clock = clock.clone();
//!     tokio::spawn(async move { clock.sleep(Duration::from_secs(1)).await })
//! };
//! clock.advance(Duration::from_secs(1)).await;
//! waiter.await.unwrap();
//! assert_eq!(clock.now(), Duration::from_secs(1));
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::yield_now;

use crate::clock::clock::Clock;

/// How many cooperative yields one drain performs.
///
/// Enough for deeply chained wakeups (producer → cell → worker → consumer),
/// small enough that a drain stays cheap.
const DRAIN_BUDGET: usize = 64;

/// Virtual time source, advanced explicitly by the test.
///
/// Cheap to share: hand out `Arc<VirtualClock>` clones to the scheduler and
/// keep one in the test body for `advance` / `run_pending` calls.
pub struct VirtualClock {
    inner: Mutex<Inner>,
    budget: usize,
}

struct Inner {
    now: Duration,
    seq: u64,
    // Keyed by (deadline, registration order) so iteration is firing order.
    sleepers: BTreeMap<(Duration, u64), oneshot::Sender<()>>,
}

impl VirtualClock {
    /// Creates a clock at virtual time zero with the default drain budget.
    pub fn new() -> Self {
        Self::with_budget(DRAIN_BUDGET)
    }

    /// Creates a clock with a custom drain budget.
    ///
    /// Raise this only if a test wires together unusually long wakeup chains.
    pub fn with_budget(budget: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                now: Duration::ZERO,
                seq: 0,
                sleepers: BTreeMap::new(),
            }),
            budget: budget.max(1),
        }
    }

    /// Returns the current virtual time.
    pub fn now(&self) -> Duration {
        self.locked().now
    }

    /// Moves virtual time forward by `dur`, firing every deadline inside the
    /// window in order.
    ///
    /// Ready tasks run first: work spawned just before the call gets to its
    /// first suspension before any time passes. Then time advances step by
    /// step: each due deadline becomes `now`, its sleepers are woken, and the
    /// runtime is drained before the next step. Sleeps registered by woken
    /// tasks join the same pass when they land inside the window.
    pub async fn advance(&self, dur: Duration) {
        self.run_pending().await;
        let target = self.locked().now + dur;
        loop {
            let batch = {
                let mut inner = self.locked();
                match inner.next_deadline() {
                    Some(deadline) if deadline <= target => {
                        inner.now = deadline;
                        inner.take_due(deadline)
                    }
                    _ => {
                        inner.now = target;
                        Vec::new()
                    }
                }
            };
            if batch.is_empty() {
                break;
            }
            for waker in batch {
                let _ = waker.send(());
            }
            self.run_pending().await;
        }
        self.run_pending().await;
    }

    /// Lets already-runnable tasks make progress without moving time.
    ///
    /// Useful right after spawning: producers run up to their first suspension
    /// (emitting any leading values) before the test starts advancing.
    pub async fn run_pending(&self) {
        for _ in 0..self.budget {
            yield_now().await;
        }
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Inner {
    fn next_deadline(&self) -> Option<Duration> {
        self.sleepers.keys().next().map(|&(deadline, _)| deadline)
    }

    fn take_due(&mut self, deadline: Duration) -> Vec<oneshot::Sender<()>> {
        let mut due = Vec::new();
        while let Some(entry) = self.sleepers.first_entry() {
            if entry.key().0 > deadline {
                break;
            }
            due.push(entry.remove());
        }
        due
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for VirtualClock {
    async fn sleep(&self, dur: Duration) {
        if dur.is_zero() {
            yield_now().await;
            return;
        }
        let rx = {
            let mut inner = self.locked();
            let deadline = inner.now + dur;
            let seq = inner.seq;
            inner.seq += 1;
            let (tx, rx) = oneshot::channel();
            inner.sleepers.insert((deadline, seq), tx);
            rx
        };
        // Sender dropped (clock torn down mid-test) counts as elapsed.
        let _ = rx.await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn millis(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test]
    async fn test_sleep_completes_only_after_full_advance() {
        let clock = Arc::new(VirtualClock::new());
        let done = Arc::new(AtomicBool::new(false));

        {
            let clock = clock.clone();
            let done = done.clone();
            tokio::spawn(async move {
                clock.sleep(secs(1)).await;
                done.store(true, Ordering::SeqCst);
            });
        }

        clock.run_pending().await;
        assert!(!done.load(Ordering::SeqCst));

        clock.advance(millis(999)).await;
        assert!(!done.load(Ordering::SeqCst));

        clock.advance(millis(1)).await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_advance_steps_through_chained_sleeps() {
        let clock = Arc::new(VirtualClock::new());
        let ticks = Arc::new(AtomicUsize::new(0));

        {
            let clock = clock.clone();
            let ticks = ticks.clone();
            tokio::spawn(async move {
                for _ in 0..3 {
                    clock.sleep(secs(1)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        clock.advance(secs(1)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        // One advance walks through both remaining deadlines.
        clock.advance(secs(2)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_sleepers_fire_in_deadline_order() {
        let clock = Arc::new(VirtualClock::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        for (label, delay) in [("slow", secs(2)), ("fast", secs(1))] {
            let clock = clock.clone();
            let order = order.clone();
            tokio::spawn(async move {
                clock.sleep(delay).await;
                order.lock().unwrap().push(label);
            });
        }

        clock.run_pending().await;
        clock.advance(secs(2)).await;
        assert_eq!(*order.lock().unwrap(), vec!["fast", "slow"]);
    }

    #[tokio::test]
    async fn test_same_deadline_fires_in_registration_order() {
        let clock = Arc::new(VirtualClock::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            {
                let clock = clock.clone();
                let order = order.clone();
                tokio::spawn(async move {
                    clock.sleep(secs(1)).await;
                    order.lock().unwrap().push(label);
                });
            }
            // Pin registration order before spawning the next sleeper.
            clock.run_pending().await;
        }

        clock.advance(secs(1)).await;
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_zero_sleep_completes_without_advance() {
        let clock = Arc::new(VirtualClock::new());
        let done = Arc::new(AtomicBool::new(false));

        {
            let clock = clock.clone();
            let done = done.clone();
            tokio::spawn(async move {
                clock.sleep(Duration::ZERO).await;
                done.store(true, Ordering::SeqCst);
            });
        }

        clock.run_pending().await;
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_now_tracks_advances() {
        let clock = VirtualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        clock.advance(millis(250)).await;
        assert_eq!(clock.now(), millis(250));

        clock.advance(secs(1)).await;
        assert_eq!(clock.now(), millis(1250));
    }
}
