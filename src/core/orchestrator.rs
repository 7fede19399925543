//! # Orchestrator: session lifecycle over streams and consumers.
//!
//! The [`Orchestrator`] is the engine's front door. It owns the injected
//! [`Scheduler`] and session [`Config`], hands out cancellation [`Scope`]s,
//! and wires every stream type through a policy cell to a consumer worker.
//!
//! ## High-level architecture
//! ```text
//! ColdStream ──► collect() ── producer task ──► [cell] ──► worker ──► Consume
//! StateHolder ─► observe() ── watch forwarder ► [cell] ──► worker ──► Consume
//! EventBus ────► listen() ─── bus tap ────────► [cell] ──► worker ──► Consume
//!
//! every spawned task:
//!   - runs on the lane from CollectOptions::context
//!   - observes a child token of its Scope
//!   - is counted by the Scope's tracker and abort-registered by name
//!
//! Shutdown path:
//!   shutdown(scope)
//!     └─► scope.cancel()      token fires; tasks abort at next suspension
//!     └─► timeout(Config::grace, tracker.wait())
//!            ├─ all stopped  → Ok(())
//!            └─ overran      → Err(EngineError::GraceExceeded { grace, stuck })
//! ```
//!
//! ## Rules
//! - **No ambient state**: clock, runtime lanes and configuration all arrive
//!   through the constructor.
//! - **One scope per session**: subscriptions and tasks bound to a scope are
//!   torn down as a unit; independent scopes do not affect each other.
//! - **Cancellation is a signal**: a cancelled subscription settles `Ok`;
//!   only stream failures and consumer errors surface as `Err`.

use std::future::Future;
use std::sync::Arc;

use futures::future;
use tokio_util::sync::CancellationToken;

use crate::collect::{link, run_consumer, CollectOptions, ConsumeRef, Intake, Subscription};
use crate::config::Config;
use crate::core::scope::Scope;
use crate::error::{EngineError, StreamError};
use crate::exec::{ExecContext, Scheduler, StreamCtx, TaskHandle};
use crate::streams::{ColdStream, EmitFuture, Emitter, EventBus, SinkFn, StateHolder};

/// Session-level entry point: subscriptions, ad-hoc tasks, teardown.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use streamvisor::{
///     ColdStream, CollectOptions, Config, ConsumeFn, Orchestrator, Scheduler, StreamCtx,
///     StreamError, TokioClock,
/// };
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let scheduler = Arc::new(Scheduler::current_thread(Arc::new(TokioClock)));
///     let orch = Orchestrator::new(Config::default(), scheduler);
///     let scope = orch.scope();
///
///     let countdown = ColdStream::new(|em| async move {
///         for v in (0..=3u32).rev() {
///             em.emit(v).await?;
///             em.delay(Duration::from_millis(1)).await?;
///         }
///         Ok(())
///     });
///
///     let sub = orch.collect(
///         &scope,
///         &countdown,
///         CollectOptions::buffered(),
///         ConsumeFn::arc("printer", |v: u32, _ctx: StreamCtx| async move {
///             println!("tick {v}");
///             Ok::<_, StreamError>(())
///         }),
///     );
///
///     sub.done().await.unwrap();
///     orch.shutdown(scope).await.unwrap();
/// }
/// ```
pub struct Orchestrator {
    cfg: Config,
    scheduler: Arc<Scheduler>,
}

impl Orchestrator {
    /// Creates an orchestrator around an injected scheduler.
    pub fn new(cfg: Config, scheduler: Arc<Scheduler>) -> Self {
        Self { cfg, scheduler }
    }

    /// Session configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// The injected scheduler (clock + lanes).
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Creates a fresh cancellation scope for one session.
    pub fn scope(&self) -> Scope {
        Scope::new()
    }

    /// Cancels a scope. Equivalent to [`Scope::cancel`]; idempotent.
    pub fn cancel(&self, scope: &Scope) {
        scope.cancel();
    }

    /// Creates an [`EventBus`] with the configured replay capacity.
    pub fn event_bus<T: Clone + Send + 'static>(&self) -> EventBus<T> {
        EventBus::new(self.cfg.replay_capacity)
    }

    /// Runs an ad-hoc task bound to `scope` on the given lane.
    ///
    /// The closure receives a [`StreamCtx`] whose token is a child of the
    /// scope's: cancelling the scope (or the returned handle) stops the task
    /// at its next suspension point.
    pub fn run_in<F, Fut>(
        &self,
        scope: &Scope,
        name: impl Into<Arc<str>>,
        context: ExecContext,
        f: F,
    ) -> TaskHandle
    where
        F: FnOnce(StreamCtx) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = scope.token().child_token();
        let ctx = self.scheduler.stream_ctx(token.clone());
        let join = self.scheduler.spawn(context, scope.track(f(ctx)));
        scope.register(name.into(), join.abort_handle());
        TaskHandle::new(token, join)
    }

    /// Subscribes a consumer to a cold stream.
    ///
    /// Starts a fresh producer run for this subscription (nothing is shared
    /// with other collectors of the same stream) and a consumer worker
    /// driven by `options.policy`, both on `options.context`.
    ///
    /// The subscription settles when the producer completes, the producer
    /// fails, the consumer errors, or the scope/subscription is cancelled.
    pub fn collect<T: Send + 'static>(
        &self,
        scope: &Scope,
        stream: &ColdStream<T>,
        options: CollectOptions,
        consumer: ConsumeRef<T>,
    ) -> Subscription {
        let name: Arc<str> = Arc::from(consumer.name());
        let token = scope.token().child_token();
        let (deliverer, intake) = link(options.policy);

        let produce = {
            let stream = stream.clone();
            let deliverer = deliverer.clone();
            let ctx = self.scheduler.stream_ctx(token.clone());
            async move {
                let feed = deliverer.clone();
                let sink: Arc<SinkFn<T>> = Arc::new(move |value: T| -> EmitFuture {
                    let accepted = feed.deliver(value);
                    Box::pin(future::ready(if accepted {
                        Ok(())
                    } else {
                        Err(StreamError::Closed)
                    }))
                });
                // Cancellation is a control signal, not a failure terminal.
                let outcome = match stream.run(Emitter::new(ctx, sink)).await {
                    Err(err) if err.is_cancellation() => Ok(()),
                    other => other,
                };
                deliverer.finish(outcome);
            }
        };
        let producer = self.scheduler.spawn(options.context, scope.track(produce));
        scope.register(name.clone(), producer.abort_handle());

        self.spawn_worker(scope, name, token, options.context, intake, consumer)
    }

    /// Subscribes a consumer to a state holder.
    ///
    /// The consumer receives the current value immediately, then every
    /// subsequent [`StateHolder::set`]. Writes faster than the consumer are
    /// conflated twice over: the watch channel keeps only the newest value,
    /// and the policy cell applies on top of that. A state holder never
    /// completes on its own; the subscription ends with its scope (or if the
    /// holder itself is dropped).
    pub fn observe<T: Clone + Send + Sync + 'static>(
        &self,
        scope: &Scope,
        holder: &StateHolder<T>,
        options: CollectOptions,
        consumer: ConsumeRef<T>,
    ) -> Subscription {
        let name: Arc<str> = Arc::from(consumer.name());
        let token = scope.token().child_token();
        let (deliverer, intake) = link(options.policy);

        let forward = {
            let mut rx = holder.watch();
            let token = token.clone();
            async move {
                loop {
                    let value = rx.borrow_and_update().clone();
                    if !deliverer.deliver(value) {
                        return;
                    }
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return,
                        changed = rx.changed() => {
                            if changed.is_err() {
                                // Holder dropped: close the subscription cleanly.
                                deliverer.finish(Ok(()));
                                return;
                            }
                        }
                    }
                }
            }
        };
        let forwarder = self.scheduler.spawn(options.context, scope.track(forward));
        scope.register(name.clone(), forwarder.abort_handle());

        self.spawn_worker(scope, name, token, options.context, intake, consumer)
    }

    /// Subscribes a consumer to an event bus.
    ///
    /// The consumer first receives the bus's replay contents oldest-first,
    /// then live emissions; replayed values go through the same policy cell
    /// as live ones. The subscription settles when the bus is closed or
    /// failed, or with its scope.
    pub fn listen<T: Clone + Send + 'static>(
        &self,
        scope: &Scope,
        bus: &EventBus<T>,
        options: CollectOptions,
        consumer: ConsumeRef<T>,
    ) -> Subscription {
        let name: Arc<str> = Arc::from(consumer.name());
        let token = scope.token().child_token();
        let (deliverer, intake) = link(options.policy);
        bus.attach(deliverer);
        self.spawn_worker(scope, name, token, options.context, intake, consumer)
    }

    /// Cancels the scope, then waits up to [`Config::grace`] for everything
    /// it owns to stop.
    ///
    /// - Grace `0` → cancel and return `Ok` immediately (no wait).
    /// - Window overrun → [`EngineError::GraceExceeded`] with the sorted
    ///   names of tasks that were still running.
    pub async fn shutdown(&self, scope: Scope) -> Result<(), EngineError> {
        scope.cancel();
        scope.close();

        let grace = match self.cfg.grace_window() {
            Some(grace) => grace,
            None => return Ok(()),
        };
        if tokio::time::timeout(grace, scope.wait()).await.is_err() {
            return Err(EngineError::GraceExceeded {
                grace,
                stuck: scope.stuck_names(),
            });
        }
        Ok(())
    }

    fn spawn_worker<T: Send + 'static>(
        &self,
        scope: &Scope,
        name: Arc<str>,
        token: CancellationToken,
        context: ExecContext,
        intake: Intake<T>,
        consumer: ConsumeRef<T>,
    ) -> Subscription {
        let ctx = self.scheduler.stream_ctx(token.clone());
        let join = self
            .scheduler
            .spawn(context, scope.track(run_consumer(intake, consumer, ctx)));
        scope.register(name.clone(), join.abort_handle());
        Subscription::new(name, token, join)
    }
}
