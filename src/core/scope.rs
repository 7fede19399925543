//! # Cancellation scope: one unit of teardown.
//!
//! A [`Scope`] owns every task and subscription started through it. Cancelling
//! the scope cancels all of them transitively; shutdown waits for them as a
//! group.
//!
//! ## Architecture
//! ```text
//! Scope
//!   ├─ token ──► child per task/subscription (cancel propagates down)
//!   ├─ tracker ──► counts live tracked futures (shutdown waits on it)
//!   └─ entries ──► (name, AbortHandle) per spawned task (abort + stuck report)
//! ```
//!
//! ## Rules
//! - **Cancel is transitive and idempotent**: the token fires once, every
//!   owned task is aborted at its next suspension point, a step already
//!   executing completes first.
//! - **No action after cancel**: workers check the token before starting a
//!   consumer action, so once `cancel()` returns no new action begins.
//! - **Drop does not cancel**: dropping a `Scope` detaches its work; stop it
//!   through [`Scope::cancel`] or `Orchestrator::shutdown`.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::task_tracker::TrackedFuture;
use tokio_util::task::TaskTracker;

/// Owns the tasks and subscriptions of one session.
///
/// Created by `Orchestrator::scope()`. All subscribe entry points take a
/// `&Scope` and bind their spawned work to it: each gets a child of the
/// scope's token and lands in the scope's tracker.
pub struct Scope {
    token: CancellationToken,
    tracker: TaskTracker,
    entries: Mutex<Vec<Entry>>,
}

struct Entry {
    name: Arc<str>,
    abort: AbortHandle,
}

impl Scope {
    pub(crate) fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// The scope's root token. Tasks observe a child of it.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True once the scope has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancels every task and subscription owned by this scope.
    ///
    /// Fires the token (pending delays resolve into cancellation, no further
    /// consumer action starts) and aborts every registered task at its next
    /// suspension point. Idempotent; work started on an already-cancelled
    /// scope stops before its first action.
    pub fn cancel(&self) {
        self.token.cancel();
        for entry in self.locked().iter() {
            entry.abort.abort();
        }
    }

    /// Wraps a future so the scope's tracker counts it until completion.
    pub(crate) fn track<F>(&self, fut: F) -> TrackedFuture<F>
    where
        F: Future,
    {
        self.tracker.track_future(fut)
    }

    /// Records a spawned task for abort-on-cancel and stuck reporting.
    pub(crate) fn register(&self, name: Arc<str>, abort: AbortHandle) {
        let mut entries = self.locked();
        entries.retain(|e| !e.abort.is_finished());
        entries.push(Entry { name, abort });
    }

    /// Stops accepting completion waits for new futures; `wait` resolves once
    /// the already-tracked ones finish.
    pub(crate) fn close(&self) {
        self.tracker.close();
    }

    /// Resolves when every tracked future has finished. Requires [`close`]
    /// first, otherwise it may wait forever.
    ///
    /// [`close`]: Scope::close
    pub(crate) async fn wait(&self) {
        self.tracker.wait().await;
    }

    /// Sorted names of registered tasks that have not finished.
    pub(crate) fn stuck_names(&self) -> Vec<String> {
        let mut stuck: Vec<String> = self
            .locked()
            .iter()
            .filter(|e| !e.abort.is_finished())
            .map(|e| e.name.to_string())
            .collect();
        stuck.sort_unstable();
        stuck.dedup();
        stuck
    }

    fn locked(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_aborts_registered_tasks() {
        let scope = Scope::new();
        let join = tokio::spawn(scope.track(std::future::pending::<()>()));
        scope.register(Arc::from("stuck"), join.abort_handle());
        assert_eq!(scope.stuck_names(), ["stuck"]);

        scope.cancel();
        scope.cancel();
        assert!(scope.is_cancelled());

        scope.close();
        scope.wait().await;
        assert!(scope.stuck_names().is_empty());
    }

    #[tokio::test]
    async fn test_stuck_names_are_sorted_and_unique() {
        let scope = Scope::new();
        let a = tokio::spawn(std::future::pending::<()>());
        let b = tokio::spawn(std::future::pending::<()>());
        let c = tokio::spawn(std::future::pending::<()>());
        scope.register(Arc::from("zeta"), a.abort_handle());
        scope.register(Arc::from("alpha"), b.abort_handle());
        scope.register(Arc::from("alpha"), c.abort_handle());

        assert_eq!(scope.stuck_names(), ["alpha", "zeta"]);

        a.abort();
        b.abort();
        c.abort();
    }

    #[tokio::test]
    async fn test_finished_entries_are_pruned_on_register() {
        let scope = Scope::new();
        let gone = tokio::spawn(std::future::pending::<()>());
        scope.register(Arc::from("gone"), gone.abort_handle());
        gone.abort();
        let _ = gone.await;

        // The finished handle is swept the next time something registers.
        let live = tokio::spawn(std::future::pending::<()>());
        scope.register(Arc::from("live"), live.abort_handle());
        assert_eq!(scope.stuck_names(), ["live"]);
        live.abort();
    }
}
