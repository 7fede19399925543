//! # Per-task context: clock plus cancellation.
//!
//! [`StreamCtx`] is the bundle every producer, consumer action, and scheduled
//! task receives. It carries the engine clock and the task's own
//! [`CancellationToken`], and its [`delay`](StreamCtx::delay) is the
//! cancellation-aware suspension used throughout the engine: it resolves
//! `Err(Canceled)` the moment the token fires, never later than the sleep.
//!
//! Contexts form a tree through [`StreamCtx::child`]: cancelling a parent
//! token cancels every child, which is how scope cancellation reaches each
//! producer and consumer at its next suspension point.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::clock::ClockRef;
use crate::error::StreamError;

/// Clock + cancellation token handed to a unit of work.
///
/// Cheap to clone; clones share the same token.
#[derive(Clone)]
pub struct StreamCtx {
    clock: ClockRef,
    token: CancellationToken,
}

impl StreamCtx {
    /// Creates a context from a clock and a token.
    pub fn new(clock: ClockRef, token: CancellationToken) -> Self {
        Self { clock, token }
    }

    /// Returns the engine clock.
    pub fn clock(&self) -> &ClockRef {
        &self.clock
    }

    /// Returns this task's cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True once the owning scope (or this task) has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Derives a child context: same clock, child token.
    ///
    /// Cancelling the parent cancels the child; cancelling the child leaves
    /// the parent running.
    pub fn child(&self) -> StreamCtx {
        Self {
            clock: self.clock.clone(),
            token: self.token.child_token(),
        }
    }

    /// Suspends for `dur` on the engine clock, or until cancelled.
    ///
    /// Returns `Err(StreamError::Canceled)` if the token fires first or was
    /// already cancelled on entry.
    pub async fn delay(&self, dur: Duration) -> Result<(), StreamError> {
        if self.token.is_cancelled() {
            return Err(StreamError::Canceled);
        }
        tokio::select! {
            _ = self.token.cancelled() => Err(StreamError::Canceled),
            _ = self.clock.sleep(dur) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::VirtualClock;

    fn ctx_with_clock() -> (Arc<VirtualClock>, StreamCtx) {
        let clock = Arc::new(VirtualClock::new());
        let ctx = StreamCtx::new(clock.clone(), CancellationToken::new());
        (clock, ctx)
    }

    #[tokio::test]
    async fn test_delay_waits_for_virtual_advance() {
        let (clock, ctx) = ctx_with_clock();
        let waiter = tokio::spawn(async move { ctx.delay(Duration::from_secs(1)).await });

        clock.run_pending().await;
        assert!(!waiter.is_finished());

        clock.advance(Duration::from_secs(1)).await;
        assert_eq!(waiter.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_delay_resolves_canceled_when_token_fires() {
        let (clock, ctx) = ctx_with_clock();
        let token = ctx.token().clone();
        let waiter = tokio::spawn(async move { ctx.delay(Duration::from_secs(10)).await });

        clock.run_pending().await;
        token.cancel();
        clock.run_pending().await;

        assert_eq!(waiter.await.unwrap(), Err(StreamError::Canceled));
        // Virtual time never moved.
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_delay_on_cancelled_token_fails_fast() {
        let (_clock, ctx) = ctx_with_clock();
        ctx.token().cancel();
        assert_eq!(ctx.delay(Duration::from_secs(1)).await, Err(StreamError::Canceled));
    }

    #[tokio::test]
    async fn test_child_cancellation_is_one_way() {
        let (_clock, parent) = ctx_with_clock();
        let child = parent.child();

        child.token().cancel();
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.token().cancel();
        assert!(other.is_cancelled());
    }
}
