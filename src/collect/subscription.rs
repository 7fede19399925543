//! # Subscription handle.
//!
//! One [`Subscription`] per subscribed consumer: it ties the consumer worker,
//! the producer (or forwarder) feeding it, and their shared cancellation
//! token into a single cancel-and-await surface.
//!
//! ## Rules
//! - **Cooperative cancel**: [`Subscription::cancel`] fires the token. The
//!   worker stops before its next consumer action; an in-flight action runs
//!   to its next suspension point and settles as a clean stop.
//! - **Cancellation is not an error**: [`Subscription::done`] resolves
//!   `Ok(())` for cancelled and naturally-completed subscriptions alike;
//!   `Err` means the stream failed or the consumer reported a failure.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::StreamError;

/// Handle for one consumer bound to one stream.
///
/// Returned by the orchestrator's subscribe entry points. Dropping the handle
/// detaches the subscription (it keeps running under its scope); use
/// [`cancel`] to stop it early or [`done`] to await its outcome.
///
/// [`cancel`]: Subscription::cancel
/// [`done`]: Subscription::done
pub struct Subscription {
    name: Arc<str>,
    token: CancellationToken,
    worker: JoinHandle<Result<(), StreamError>>,
}

impl Subscription {
    pub(crate) fn new(
        name: Arc<str>,
        token: CancellationToken,
        worker: JoinHandle<Result<(), StreamError>>,
    ) -> Self {
        Self {
            name,
            token,
            worker,
        }
    }

    /// Consumer name this subscription was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The subscription's own cancellation token (child of its scope).
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Requests a cooperative stop: no further consumer action starts, and
    /// any in-flight action is cancelled at its next suspension point.
    ///
    /// Idempotent. The producer feeding this subscription observes the same
    /// token and winds down with it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once the consumer worker has finished.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Waits for the subscription to settle.
    ///
    /// - `Ok(())` on natural completion, `close()`, or cancellation.
    /// - `Err` when the stream failed or the consumer returned an error.
    pub async fn done(self) -> Result<(), StreamError> {
        match self.worker.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Ok(()),
            Err(_) => Err(StreamError::failed("consumer worker panicked")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_done_reports_worker_outcome() {
        let token = CancellationToken::new();
        let worker = tokio::spawn(async { Err(StreamError::failed("boom")) });
        let sub = Subscription::new(Arc::from("failing"), token, worker);

        assert_eq!(sub.name(), "failing");
        assert_eq!(sub.done().await, Err(StreamError::failed("boom")));
    }

    #[tokio::test]
    async fn test_cancel_fires_token_and_settles_clean() {
        let token = CancellationToken::new();
        let worker = {
            let token = token.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                Ok(())
            })
        };
        let sub = Subscription::new(Arc::from("waiter"), token.clone(), worker);

        assert!(!sub.is_finished());
        sub.cancel();
        assert!(token.is_cancelled());
        assert_eq!(sub.done().await, Ok(()));
    }

    #[tokio::test]
    async fn test_aborted_worker_counts_as_clean_stop() {
        let token = CancellationToken::new();
        let worker =
            tokio::spawn(async { Ok::<_, StreamError>(std::future::pending::<()>().await) });
        worker.abort();
        let sub = Subscription::new(Arc::from("aborted"), token, worker);

        assert_eq!(sub.done().await, Ok(()));
    }
}
