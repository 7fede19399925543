//! # Hot state: always-valued, conflated.
//!
//! [`StateHolder`] is a thin wrapper over [`tokio::sync::watch`] that keeps
//! exactly one current value. Writers replace it synchronously; observers
//! always see the latest value and never a history.
//!
//! ## Rules
//! - **Always valued**: constructed with an initial value; `get()` never
//!   blocks and never fails.
//! - **Conflated**: a subscriber that falls behind skips intermediate values
//!   and resumes at the newest one. Delivery of *the latest* value is
//!   guaranteed, delivery of every value is not.
//! - **No equality gate**: `set()` notifies subscribers even when the new
//!   value equals the old one. De-duplication, if wanted, belongs to the
//!   caller.
//! - **Hot**: the value exists and changes regardless of subscribers.

use tokio::sync::watch;

/// Latest-value state holder.
///
/// Readers and writers share the holder by reference (or `Arc`); observers
/// attach through the orchestrator, which turns the underlying watch channel
/// into a policy-driven subscription.
///
/// # Example
/// ```
/// use streamvisor::StateHolder;
///
/// let counter = StateHolder::new(0);
/// assert_eq!(counter.get(), 0);
///
/// counter.set(5);
/// counter.update(|n| *n += 1);
/// assert_eq!(counter.get(), 6);
/// ```
pub struct StateHolder<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone + Send + Sync + 'static> StateHolder<T> {
    /// Creates a holder with its initial value.
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Replaces the current value and notifies every observer.
    ///
    /// Notification is unconditional: setting the same value again still
    /// wakes subscribers.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Mutates the current value in place and notifies every observer.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        self.tx.send_modify(f);
    }

    /// Opens a raw watch on the value for subscription plumbing.
    pub(crate) fn watch(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}
