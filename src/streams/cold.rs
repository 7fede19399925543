//! # Cold streams: lazy, per-subscriber producers.
//!
//! [`ColdStream`] wraps a closure that *creates* a new producer future per
//! subscription. Nothing runs until someone collects; two collectors of the
//! same stream drive two completely independent runs.
//!
//! ## Architecture
//! ```text
//! ColdStream<T> ── run(Emitter<T>) ──► producer future
//!                                        └─ emit(v) ──► sink ──► consumer
//!
//! operators rewire the sink and reuse the producer:
//!   map(f):    sink'(v) = sink(f(v))
//!   filter(p): sink'(v) = p(&v) ? sink(v) : ready(Ok)
//!   flatMapConcat(f): sink'(v) = run f(v) to completion into sink
//! ```
//!
//! ## Rules
//! - **Lazy**: constructing or chaining operators runs nothing.
//! - **Fresh run per subscription**: every `run`/`collect` invokes the
//!   producer closure again; no state is shared between runs.
//! - **Emission suspends**: `emit` resolves only after the value has been
//!   accepted downstream. With an inline collector that means the consumer
//!   action finished; with a policy cell, that the value was handed off.
//! - **Errors stay in their run**: a failing producer terminates that run
//!   only; concurrent runs are untouched.
//! - **Cancellation is a signal**: `emit` and `delay` resolve
//!   `Err(Canceled)` once the subscription's token fires, and the producer
//!   unwinds through `?`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, BoxFuture};
use tokio::sync::mpsc;

use crate::error::StreamError;
use crate::exec::StreamCtx;

/// Future returned by producers and sinks.
pub(crate) type EmitFuture = BoxFuture<'static, Result<(), StreamError>>;

type ProduceFn<T> = dyn Fn(Emitter<T>) -> EmitFuture + Send + Sync;
pub(crate) type SinkFn<T> = dyn Fn(T) -> EmitFuture + Send + Sync;

/// Emission handle passed to a producer for one run.
///
/// Carries the downstream sink and the subscription's [`StreamCtx`];
/// [`emit`](Emitter::emit) and [`delay`](Emitter::delay) are the two
/// suspension points a producer is expected to live in.
pub struct Emitter<T> {
    sink: Arc<SinkFn<T>>,
    ctx: StreamCtx,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
            ctx: self.ctx.clone(),
        }
    }
}

impl<T: Send + 'static> Emitter<T> {
    pub(crate) fn new(ctx: StreamCtx, sink: Arc<SinkFn<T>>) -> Self {
        Self { sink, ctx }
    }

    /// Hands a value downstream, suspending until it is accepted.
    ///
    /// Resolves `Err(Canceled)` if the subscription was cancelled, and
    /// `Err(Closed)` once the subscriber side is gone.
    pub async fn emit(&self, value: T) -> Result<(), StreamError> {
        if self.ctx.is_cancelled() {
            return Err(StreamError::Canceled);
        }
        (self.sink)(value).await
    }

    /// Suspends on the engine clock, cancellation-aware.
    pub async fn delay(&self, dur: Duration) -> Result<(), StreamError> {
        self.ctx.delay(dur).await
    }

    /// Returns the run's context (clock + token).
    pub fn ctx(&self) -> &StreamCtx {
        &self.ctx
    }
}

/// Lazily started stream; a fresh producer run per subscription.
///
/// Cheap to clone: clones share the producer closure, not any run state.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use streamvisor::{ColdStream, StreamCtx, TokioClock};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let countdown = ColdStream::new(|em| async move {
///     let mut current = 3u32;
///     em.emit(current).await?;
///     while current > 0 {
///         em.delay(Duration::from_millis(1)).await?;
///         current -= 1;
///         em.emit(current).await?;
///     }
///     Ok(())
/// });
///
/// let ctx = StreamCtx::new(Arc::new(TokioClock), CancellationToken::new());
/// let sum = countdown.reduce(&ctx, |acc, v| acc + v).await.unwrap();
/// assert_eq!(sum, 6);
/// # }
/// ```
pub struct ColdStream<T> {
    produce: Arc<ProduceFn<T>>,
}

impl<T> Clone for ColdStream<T> {
    fn clone(&self) -> Self {
        Self {
            produce: self.produce.clone(),
        }
    }
}

impl<T: Send + 'static> ColdStream<T> {
    /// Creates a cold stream from a producer closure.
    ///
    /// The closure is invoked once per subscription and must create a fresh
    /// future each time; state lives inside the future, so restarted or
    /// concurrent runs never share it.
    pub fn new<F, Fut>(produce: F) -> Self
    where
        F: Fn(Emitter<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StreamError>> + Send + 'static,
    {
        Self {
            produce: Arc::new(move |em| Box::pin(produce(em))),
        }
    }

    /// Starts one producer run against the given emitter.
    pub(crate) fn run(&self, em: Emitter<T>) -> EmitFuture {
        (self.produce)(em)
    }

    /// Keeps only values matching the predicate.
    pub fn filter<P>(self, predicate: P) -> ColdStream<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let produce = self.produce;
        let predicate = Arc::new(predicate);
        ColdStream {
            produce: Arc::new(move |em: Emitter<T>| {
                let sink = em.sink.clone();
                let predicate = predicate.clone();
                let upstream = Emitter::new(
                    em.ctx.clone(),
                    Arc::new(move |value: T| -> EmitFuture {
                        if predicate(&value) {
                            sink(value)
                        } else {
                            Box::pin(future::ready(Ok(())))
                        }
                    }),
                );
                produce(upstream)
            }),
        }
    }

    /// Transforms every value.
    pub fn map<U, F>(self, transform: F) -> ColdStream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let produce = self.produce;
        let transform = Arc::new(transform);
        ColdStream {
            produce: Arc::new(move |em: Emitter<U>| {
                let sink = em.sink.clone();
                let transform = transform.clone();
                let upstream = Emitter::new(
                    em.ctx.clone(),
                    Arc::new(move |value: T| sink(transform(value))),
                );
                produce(upstream)
            }),
        }
    }

    /// Runs a side effect on every value without consuming it.
    pub fn on_each<F>(self, action: F) -> ColdStream<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let produce = self.produce;
        let action = Arc::new(action);
        ColdStream {
            produce: Arc::new(move |em: Emitter<T>| {
                let sink = em.sink.clone();
                let action = action.clone();
                let upstream = Emitter::new(
                    em.ctx.clone(),
                    Arc::new(move |value: T| {
                        action(&value);
                        sink(value)
                    }),
                );
                produce(upstream)
            }),
        }
    }

    /// Maps every value to an inner stream and drains it to completion
    /// before the outer producer resumes.
    ///
    /// Inner emissions never interleave: the outer `emit` suspends for the
    /// whole inner run, which is what makes the concatenation sequential.
    pub fn flat_map_concat<U, F>(self, transform: F) -> ColdStream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> ColdStream<U> + Send + Sync + 'static,
    {
        let produce = self.produce;
        let transform = Arc::new(transform);
        ColdStream {
            produce: Arc::new(move |em: Emitter<U>| {
                let downstream = em.clone();
                let transform = transform.clone();
                let upstream = Emitter::new(
                    em.ctx.clone(),
                    Arc::new(move |value: T| {
                        let inner = transform(value);
                        inner.run(downstream.clone())
                    }),
                );
                produce(upstream)
            }),
        }
    }

    /// Runs the stream to completion, awaiting the consumer for every value.
    ///
    /// This is the unbuffered collector: the producer's `emit` resolves only
    /// after `consumer`'s future for that value finished, so a slow consumer
    /// paces the producer.
    pub async fn collect<F, Fut>(&self, ctx: &StreamCtx, consumer: F) -> Result<(), StreamError>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StreamError>> + Send + 'static,
    {
        let consumer = Arc::new(consumer);
        let sink: Arc<SinkFn<T>> = Arc::new(move |value| {
            let consumer = consumer.clone();
            Box::pin(async move { consumer(value).await })
        });
        self.run(Emitter::new(ctx.clone(), sink)).await
    }

    /// Accumulates every value onto a seed and returns the final value.
    ///
    /// An empty stream returns the seed unchanged.
    pub async fn fold<A, F>(&self, ctx: &StreamCtx, seed: A, combine: F) -> Result<A, StreamError>
    where
        A: Send,
        F: FnMut(A, T) -> A + Send,
    {
        self.pull(ctx, seed, combine).await
    }

    /// Combines values pairwise and returns the final value.
    ///
    /// Fails with [`StreamError::Empty`] if the stream completes without
    /// emitting.
    pub async fn reduce<F>(&self, ctx: &StreamCtx, mut combine: F) -> Result<T, StreamError>
    where
        F: FnMut(T, T) -> T + Send,
    {
        let acc = self
            .pull(ctx, None, |acc: Option<T>, value| {
                Some(match acc {
                    Some(prev) => combine(prev, value),
                    None => value,
                })
            })
            .await?;
        acc.ok_or(StreamError::Empty)
    }

    /// Counts the values matching the predicate.
    pub async fn count<P>(&self, ctx: &StreamCtx, mut predicate: P) -> Result<usize, StreamError>
    where
        P: FnMut(&T) -> bool + Send,
    {
        self.pull(ctx, 0usize, |count, value| {
            if predicate(&value) {
                count + 1
            } else {
                count
            }
        })
        .await
    }

    /// Drives one full run, feeding every value through `step`.
    ///
    /// The producer and the accumulator interleave on the calling task: emit
    /// hands the value over, the loop folds it, and only then does the
    /// producer resume.
    async fn pull<A>(
        &self,
        ctx: &StreamCtx,
        seed: A,
        mut step: impl FnMut(A, T) -> A + Send,
    ) -> Result<A, StreamError>
    where
        A: Send,
    {
        let (tx, mut rx) = mpsc::channel::<T>(1);
        let sink: Arc<SinkFn<T>> = Arc::new(move |value| {
            let tx = tx.clone();
            Box::pin(async move { tx.send(value).await.map_err(|_| StreamError::Closed) })
        });
        let mut produce = self.run(Emitter::new(ctx.clone(), sink));

        let mut acc = seed;
        let outcome = loop {
            tokio::select! {
                biased;
                maybe = rx.recv() => match maybe {
                    Some(value) => acc = step(acc, value),
                    None => break Ok(()),
                },
                res = &mut produce => {
                    // Producer finished; fold whatever is still in flight.
                    while let Ok(value) = rx.try_recv() {
                        acc = step(acc, value);
                    }
                    break res;
                }
            }
        };
        outcome?;
        Ok(acc)
    }
}
