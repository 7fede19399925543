//! # Subscription worker: drains a delivery cell and runs the consumer.
//!
//! One worker per subscription. It pulls from the cell built by
//! [`link`](crate::collect::link::link), invokes the consumer for each value,
//! and turns the cell's terminal into the subscription's outcome.
//!
//! ## Rules
//! - **Sequential per subscription**: at most one `on_value` runs at a time.
//! - **Cancellation first**: the worker checks its token before starting the
//!   next action; after `cancel()` returns, no new consumer action starts.
//! - **Cancellations resolve `Ok`**: `Canceled`/`Closed` terminals and
//!   consumer actions ending in `Canceled` are graceful stops, not failures.
//! - **Panic isolation**: a panicking consumer action is caught and logged;
//!   the subscription continues with the next value.
//! - **Collect-latest restart**: a newer delivery wins over the running
//!   action — the action's future is dropped at its next suspension point,
//!   so completed side effects stay, the rest never happens.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::collect::consume::ConsumeRef;
use crate::collect::link::{Intake, Msg, SlotIntake, SlotStep};
use crate::error::StreamError;
use crate::exec::StreamCtx;

/// Drains the cell until a terminal, cancellation, or consumer failure.
pub(crate) async fn run_consumer<T: Send + 'static>(
    intake: Intake<T>,
    consumer: ConsumeRef<T>,
    ctx: StreamCtx,
) -> Result<(), StreamError> {
    match intake {
        Intake::Fifo(rx) => drain_fifo(rx, consumer, ctx).await,
        Intake::Latest { slot, restart } => drain_latest(slot, restart, consumer, ctx).await,
    }
}

async fn drain_fifo<T: Send + 'static>(
    mut rx: mpsc::UnboundedReceiver<Msg<T>>,
    consumer: ConsumeRef<T>,
    ctx: StreamCtx,
) -> Result<(), StreamError> {
    loop {
        let msg = tokio::select! {
            biased;
            _ = ctx.token().cancelled() => return Ok(()),
            msg = rx.recv() => msg,
        };
        match msg {
            Some(Msg::Item(value)) => {
                if let Err(err) = apply(&consumer, value, &ctx).await {
                    return settle(err);
                }
            }
            Some(Msg::End(result)) => return settle_result(result),
            // Producer handles dropped without a terminal: clean close.
            None => return Ok(()),
        }
    }
}

async fn drain_latest<T: Send + 'static>(
    slot: SlotIntake<T>,
    restart: bool,
    consumer: ConsumeRef<T>,
    ctx: StreamCtx,
) -> Result<(), StreamError> {
    loop {
        if ctx.is_cancelled() {
            return Ok(());
        }
        match slot.take() {
            SlotStep::Value(value, seen) => {
                let outcome = if restart {
                    let action = apply(&consumer, value, &ctx);
                    tokio::pin!(action);
                    tokio::select! {
                        biased;
                        _ = ctx.token().cancelled() => return Ok(()),
                        res = &mut action => Some(res),
                        // A newer value arrived: drop the stale action.
                        _ = slot.superseded(seen) => None,
                    }
                } else {
                    Some(apply(&consumer, value, &ctx).await)
                };
                if let Some(Err(err)) = outcome {
                    return settle(err);
                }
            }
            SlotStep::End(result) => return settle_result(result),
            SlotStep::Idle => {
                tokio::select! {
                    biased;
                    _ = ctx.token().cancelled() => return Ok(()),
                    _ = slot.notified() => {}
                }
            }
        }
    }
}

/// Runs one consumer action with panic isolation.
async fn apply<T: Send + 'static>(
    consumer: &ConsumeRef<T>,
    value: T,
    ctx: &StreamCtx,
) -> Result<(), StreamError> {
    let fut = consumer.on_value(value, ctx.clone());
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic_err) => {
            eprintln!(
                "[streamvisor] consumer '{}' panicked: {:?}",
                consumer.name(),
                panic_err
            );
            Ok(())
        }
    }
}

fn settle(err: StreamError) -> Result<(), StreamError> {
    if err.is_cancellation() {
        Ok(())
    } else {
        Err(err)
    }
}

fn settle_result(result: Result<(), StreamError>) -> Result<(), StreamError> {
    match result {
        Ok(()) => Ok(()),
        Err(err) => settle(err),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::clock::VirtualClock;
    use crate::collect::consume::ConsumeFn;
    use crate::collect::link::link;
    use crate::collect::policy::CollectPolicy;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn worker_ctx() -> (Arc<VirtualClock>, StreamCtx) {
        let clock = Arc::new(VirtualClock::new());
        let ctx = StreamCtx::new(clock.clone(), CancellationToken::new());
        (clock, ctx)
    }

    /// Consumer that records `start v` / `end v` around a 1s pause.
    fn slow_recorder(log: &Arc<Mutex<Vec<String>>>) -> ConsumeRef<&'static str> {
        let log = log.clone();
        ConsumeFn::arc("slow", move |value: &'static str, ctx: StreamCtx| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(format!("start {value}"));
                ctx.delay(secs(1)).await?;
                log.lock().unwrap().push(format!("end {value}"));
                Ok::<_, StreamError>(())
            }
        })
    }

    #[tokio::test]
    async fn test_fifo_keeps_every_value_in_order() {
        let (clock, ctx) = worker_ctx();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (deliverer, intake) = link(CollectPolicy::Buffered);

        let worker = tokio::spawn(run_consumer(intake, slow_recorder(&log), ctx));

        for v in ["a", "b", "c"] {
            assert!(deliverer.deliver(v));
        }
        deliverer.finish(Ok(()));

        clock.advance(secs(3)).await;
        assert_eq!(worker.await.unwrap(), Ok(()));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["start a", "end a", "start b", "end b", "start c", "end c"]
        );
    }

    #[tokio::test]
    async fn test_conflated_skips_stale_but_finishes_running_action() {
        let (clock, ctx) = worker_ctx();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (deliverer, intake) = link(CollectPolicy::Conflated);

        let worker = tokio::spawn(run_consumer(intake, slow_recorder(&log), ctx));

        assert!(deliverer.deliver("a"));
        clock.run_pending().await;
        assert_eq!(*log.lock().unwrap(), vec!["start a"]);

        // Both land while "a" is processing; only the newest survives.
        assert!(deliverer.deliver("b"));
        assert!(deliverer.deliver("c"));

        clock.advance(secs(1)).await;
        assert_eq!(*log.lock().unwrap(), vec!["start a", "end a", "start c"]);

        clock.advance(secs(1)).await;
        deliverer.finish(Ok(()));
        clock.run_pending().await;

        assert_eq!(worker.await.unwrap(), Ok(()));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["start a", "end a", "start c", "end c"]
        );
    }

    #[tokio::test]
    async fn test_collect_latest_drops_the_running_action() {
        let (clock, ctx) = worker_ctx();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (deliverer, intake) = link(CollectPolicy::CollectLatest);

        let worker = tokio::spawn(run_consumer(intake, slow_recorder(&log), ctx));

        assert!(deliverer.deliver("a"));
        clock.run_pending().await;
        assert_eq!(*log.lock().unwrap(), vec!["start a"]);

        // "a" never finishes: its action is dropped at the delay.
        assert!(deliverer.deliver("b"));
        clock.run_pending().await;
        assert_eq!(*log.lock().unwrap(), vec!["start a", "start b"]);

        clock.advance(secs(1)).await;
        deliverer.finish(Ok(()));
        clock.run_pending().await;

        assert_eq!(worker.await.unwrap(), Ok(()));
        assert_eq!(*log.lock().unwrap(), vec!["start a", "start b", "end b"]);
    }

    #[tokio::test]
    async fn test_consumer_error_fails_the_subscription() {
        let (clock, ctx) = worker_ctx();
        let (deliverer, intake) = link(CollectPolicy::Buffered);
        let consumer: ConsumeRef<i32> =
            ConsumeFn::arc("failing", |value: i32, _ctx: StreamCtx| async move {
                if value == 2 {
                    return Err(StreamError::failed("bad value"));
                }
                Ok(())
            });

        let worker = tokio::spawn(run_consumer(intake, consumer, ctx));

        for v in [1, 2, 3] {
            deliverer.deliver(v);
        }
        clock.run_pending().await;

        assert_eq!(worker.await.unwrap(), Err(StreamError::failed("bad value")));
    }

    #[tokio::test]
    async fn test_consumer_panic_is_isolated() {
        let (clock, ctx) = worker_ctx();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (deliverer, intake) = link(CollectPolicy::Buffered);
        let consumer: ConsumeRef<i32> = {
            let seen = seen.clone();
            ConsumeFn::arc("panicky", move |value: i32, _ctx: StreamCtx| {
                let seen = seen.clone();
                async move {
                    if value == 1 {
                        panic!("boom");
                    }
                    seen.lock().unwrap().push(value);
                    Ok::<_, StreamError>(())
                }
            })
        };

        let worker = tokio::spawn(run_consumer(intake, consumer, ctx));

        deliverer.deliver(1);
        deliverer.deliver(2);
        deliverer.finish(Ok(()));
        clock.run_pending().await;

        assert_eq!(worker.await.unwrap(), Ok(()));
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_the_next_action() {
        let (clock, ctx) = worker_ctx();
        let token = ctx.token().clone();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (deliverer, intake) = link(CollectPolicy::Buffered);

        let worker = tokio::spawn(run_consumer(intake, slow_recorder(&log), ctx));

        assert!(deliverer.deliver("a"));
        clock.advance(secs(1)).await;
        assert_eq!(*log.lock().unwrap(), vec!["start a", "end a"]);

        token.cancel();
        assert!(deliverer.deliver("b"));
        clock.advance(secs(2)).await;

        assert_eq!(worker.await.unwrap(), Ok(()));
        assert_eq!(*log.lock().unwrap(), vec!["start a", "end a"]);
    }

    #[tokio::test]
    async fn test_producer_failure_reaches_the_outcome() {
        let (clock, ctx) = worker_ctx();
        let (deliverer, intake) = link::<i32>(CollectPolicy::Buffered);
        let consumer: ConsumeRef<i32> =
            ConsumeFn::arc("noop", |_v: i32, _ctx: StreamCtx| async { Ok::<_, StreamError>(()) });

        let worker = tokio::spawn(run_consumer(intake, consumer, ctx));

        deliverer.finish(Err(StreamError::failed("producer died")));
        clock.run_pending().await;

        assert_eq!(
            worker.await.unwrap(),
            Err(StreamError::failed("producer died"))
        );
    }

    #[tokio::test]
    async fn test_cancelled_terminal_resolves_gracefully() {
        let (clock, ctx) = worker_ctx();
        let (deliverer, intake) = link::<i32>(CollectPolicy::Conflated);
        let consumer: ConsumeRef<i32> =
            ConsumeFn::arc("noop", |_v: i32, _ctx: StreamCtx| async { Ok::<_, StreamError>(()) });

        let worker = tokio::spawn(run_consumer(intake, consumer, ctx));

        deliverer.finish(Err(StreamError::Canceled));
        clock.run_pending().await;

        assert_eq!(worker.await.unwrap(), Ok(()));
    }
}
