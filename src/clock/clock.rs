//! # Time source abstraction and the real-time implementation.
//!
//! This module defines the [`Clock`] trait and the production implementation
//! [`TokioClock`]. The common handle type is [`ClockRef`], an
//! `Arc<dyn Clock>` suitable for sharing across the engine.
//!
//! Producers and consumers never call `tokio::time::sleep` directly; they go
//! through the clock handed to them by the scheduler, which is what lets the
//! whole engine run against [`VirtualClock`](crate::VirtualClock) in tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Shared reference to a clock (`Arc<dyn Clock>`).
pub type ClockRef = Arc<dyn Clock>;

/// # Injectable time source.
///
/// The single suspension primitive inside streams. Everything that waits in
/// stream code — producer delays, consumer pacing — waits through a `Clock`,
/// so replacing the implementation replaces the engine's notion of time.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use streamvisor::{Clock, ClockRef, TokioClock};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let clock: ClockRef = std::sync::Arc::new(TokioClock);
/// clock.sleep(Duration::from_millis(1)).await;
/// # }
/// ```
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// Suspends the calling task until `dur` has elapsed on this clock.
    ///
    /// A zero duration still yields to the runtime at least once.
    async fn sleep(&self, dur: Duration);
}

/// Real-time clock backed by the tokio timer.
///
/// This is the production clock: `sleep` maps directly onto
/// `tokio::time::sleep` and runs on wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, dur: Duration) {
        tokio::time::sleep(dur).await;
    }
}
