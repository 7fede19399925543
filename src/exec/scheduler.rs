//! # Scheduler: lanes plus the engine clock.
//!
//! [`Scheduler`] is the spawning surface of the engine. It owns the
//! [`ClockRef`] every context borrows and knows how to place a future on one
//! of the two [`ExecContext`] lanes.
//!
//! Two shapes exist:
//! - [`Scheduler::new`] starts a dedicated single-thread runtime for the `Ui`
//!   lane. Production shape: `Ui` work is serialized regardless of the
//!   ambient runtime's flavor.
//! - [`Scheduler::current_thread`] maps both lanes onto the ambient runtime.
//!   Test shape: under a current-thread runtime everything is serialized
//!   anyway, and tasks stay on the thread the virtual clock drains.
//!
//! ## Rules
//! - Spawning requires an ambient tokio runtime (panics outside one), except
//!   `Ui` spawns on a dedicated lane.
//! - [`Scheduler::schedule`] derives a child token per task: cancelling the
//!   handle never touches siblings or the parent.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clock::ClockRef;
use crate::error::EngineError;
use crate::exec::context::{ExecContext, UiRuntime};
use crate::exec::ctx::StreamCtx;

/// Spawning surface: two lanes and the engine clock.
pub struct Scheduler {
    clock: ClockRef,
    ui: Option<UiRuntime>,
}

impl Scheduler {
    /// Creates a scheduler with a dedicated single-thread `Ui` lane.
    ///
    /// Fails with [`EngineError::UiRuntime`] if the lane's thread or runtime
    /// cannot be started.
    pub fn new(clock: ClockRef) -> Result<Self, EngineError> {
        Ok(Self {
            clock,
            ui: Some(UiRuntime::start()?),
        })
    }

    /// Creates a scheduler that maps both lanes onto the ambient runtime.
    ///
    /// Intended for tests and single-threaded binaries: run it under a
    /// current-thread runtime and the `Ui` serialization guarantee holds by
    /// construction.
    pub fn current_thread(clock: ClockRef) -> Self {
        Self { clock, ui: None }
    }

    /// Returns the engine clock.
    pub fn clock(&self) -> &ClockRef {
        &self.clock
    }

    /// Builds a [`StreamCtx`] around `token` using the engine clock.
    pub fn stream_ctx(&self, token: CancellationToken) -> StreamCtx {
        StreamCtx::new(self.clock.clone(), token)
    }

    /// Suspends for `dur` on the engine clock (not cancellation-aware; use
    /// [`StreamCtx::delay`] inside tasks).
    pub async fn delay(&self, dur: Duration) {
        self.clock.sleep(dur).await;
    }

    /// Spawns a future onto the given lane.
    pub fn spawn<F>(&self, context: ExecContext, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match (context, &self.ui) {
            (ExecContext::Ui, Some(ui)) => ui.spawn(fut),
            _ => tokio::spawn(fut),
        }
    }

    /// Schedules a unit of work and returns a cancelable [`TaskHandle`].
    ///
    /// The closure receives a [`StreamCtx`] whose token is a child of
    /// `parent`: cancelling the parent cancels the task, cancelling the
    /// handle affects this task only.
    pub fn schedule<F, Fut>(
        &self,
        context: ExecContext,
        parent: &CancellationToken,
        f: F,
    ) -> TaskHandle
    where
        F: FnOnce(StreamCtx) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = parent.child_token();
        let ctx = self.stream_ctx(token.clone());
        let join = self.spawn(context, f(ctx));
        TaskHandle { token, join }
    }
}

/// Cancelable handle for a scheduled task.
///
/// Dropping the handle detaches the task (it keeps running); [`cancel`]
/// requests a cooperative stop and aborts the task at its next suspension.
///
/// [`cancel`]: TaskHandle::cancel
pub struct TaskHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub(crate) fn new(token: CancellationToken, join: JoinHandle<()>) -> Self {
        Self { token, join }
    }

    /// Returns the task's own cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Requests cancellation: the token fires and the task is aborted.
    ///
    /// A step currently executing finishes; the task is never polled again
    /// after its next suspension point.
    pub fn cancel(&self) {
        self.token.cancel();
        self.join.abort();
    }

    /// True once the task has finished (normally or via cancellation).
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the task to finish. Cancellation counts as finished.
    pub async fn done(self) {
        let _ = self.join.await;
    }
}
