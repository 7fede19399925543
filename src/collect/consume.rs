//! # Consumer abstraction and the function-backed implementation.
//!
//! This module defines the [`Consume`] trait (async, per-value) and a
//! convenient closure-backed implementation [`ConsumeFn`]. The common handle
//! type is [`ConsumeRef`], an `Arc<dyn Consume<T>>` shared between the
//! subscription worker and its owner.
//!
//! A consumer receives each value together with the subscription's
//! [`StreamCtx`] and may suspend (delays, IO). How a slow consumer interacts
//! with a fast producer is decided by the subscription's
//! [`CollectPolicy`](crate::CollectPolicy), not by the consumer itself.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StreamError;
use crate::exec::StreamCtx;

/// Shared reference to a consumer (`Arc<dyn Consume<T>>`).
pub type ConsumeRef<T> = Arc<dyn Consume<T>>;

/// # Asynchronous consumer of one subscription's values.
///
/// `on_value` is invoked once per delivered value, sequentially per
/// subscription. Returning an error ends the subscription: `Canceled` counts
/// as a graceful stop, anything else as that subscription's failure.
///
/// Panics inside `on_value` are caught by the worker, logged, and the
/// subscription moves on to the next value.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use streamvisor::{Consume, StreamCtx, StreamError};
///
/// struct Printer;
///
/// #[async_trait]
/// impl Consume<u32> for Printer {
///     fn name(&self) -> &str { "printer" }
///
///     async fn on_value(&self, value: u32, _ctx: StreamCtx) -> Result<(), StreamError> {
///         println!("received {value}");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Consume<T: Send + 'static>: Send + Sync + 'static {
    /// Returns a stable, human-readable consumer name (used in logs and
    /// stuck-subscription reports).
    fn name(&self) -> &str;

    /// Processes one value.
    ///
    /// The context's token belongs to the subscription; `ctx.delay` resolves
    /// `Err(Canceled)` once the subscription is being torn down.
    async fn on_value(&self, value: T, ctx: StreamCtx) -> Result<(), StreamError>;
}

/// Closure-backed consumer.
///
/// Wraps `F: Fn(T, StreamCtx) -> Fut`, producing a fresh future per value.
#[derive(Debug)]
pub struct ConsumeFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ConsumeFn<F> {
    /// Creates a new closure-backed consumer.
    ///
    /// Prefer [`ConsumeFn::arc`] when you immediately need a [`ConsumeRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the consumer and returns it as a shared handle.
    ///
    /// ## Example
    /// ```
    /// use streamvisor::{ConsumeFn, ConsumeRef, StreamCtx, StreamError};
    ///
    /// let c: ConsumeRef<u32> = ConsumeFn::arc("collector", |value: u32, _ctx: StreamCtx| {
    ///     async move {
    ///         let _ = value;
    ///         Ok::<_, StreamError>(())
    ///     }
    /// });
    /// assert_eq!(c.name(), "collector");
    /// ```
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<T, F, Fut> Consume<T> for ConsumeFn<F>
where
    T: Send + 'static,
    F: Fn(T, StreamCtx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StreamError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_value(&self, value: T, ctx: StreamCtx) -> Result<(), StreamError> {
        (self.f)(value, ctx).await
    }
}

/// Printing consumer for demos and quick wiring.
///
/// Writes `"<prefix>: <value>"` to stdout for every delivered value.
#[cfg(feature = "logging")]
pub struct LogSink {
    prefix: Cow<'static, str>,
}

#[cfg(feature = "logging")]
impl LogSink {
    /// Creates a sink printing under the given prefix.
    pub fn new(prefix: impl Into<Cow<'static, str>>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Creates the sink as a shared handle.
    pub fn arc(prefix: impl Into<Cow<'static, str>>) -> Arc<Self> {
        Arc::new(Self::new(prefix))
    }
}

#[cfg(feature = "logging")]
#[async_trait]
impl<T> Consume<T> for LogSink
where
    T: std::fmt::Display + Send + 'static,
{
    fn name(&self) -> &str {
        &self.prefix
    }

    async fn on_value(&self, value: T, _ctx: StreamCtx) -> Result<(), StreamError> {
        println!("{}: {}", self.prefix, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::clock::TokioClock;

    #[tokio::test]
    async fn test_consume_fn_invokes_closure() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let c: ConsumeRef<u32> = {
            let seen = seen.clone();
            ConsumeFn::arc("recorder", move |value: u32, _ctx: StreamCtx| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(value);
                    Ok::<_, StreamError>(())
                }
            })
        };

        let ctx = StreamCtx::new(Arc::new(TokioClock), CancellationToken::new());
        c.on_value(7, ctx.clone()).await.unwrap();
        c.on_value(8, ctx).await.unwrap();

        assert_eq!(c.name(), "recorder");
        assert_eq!(*seen.lock().unwrap(), vec![7, 8]);
    }
}
