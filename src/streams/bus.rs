//! # Hot multicast stream with bounded replay.
//!
//! [`EventBus`] broadcasts values to every live subscription and replays the
//! most recent values to subscriptions that join late.
//!
//! ## Architecture
//! ```text
//! emit(v) ──► replay buffer (last K, oldest evicted)
//!        └──► tap 1 ──► delivery cell ──► worker (subscriber A, own policy)
//!        └──► tap 2 ──► delivery cell ──► worker (subscriber B, own policy)
//! ```
//!
//! ## Rules
//! - **Non-blocking emit**: `emit()` never blocks and never fails under
//!   backpressure; excess is handled by the replay buffer's oldest-first
//!   eviction and by each subscription's own policy.
//! - **Independent pacing**: every subscription owns a delivery cell; a slow
//!   subscriber never blocks or skips values for another.
//! - **Replay on join**: a new subscription receives the buffer contents
//!   oldest-first, then live emissions. Replayed values are ordinary
//!   deliveries subject to the subscription's policy.
//! - **Single terminal**: `close()` and `fail()` terminate every subscription;
//!   the first terminal wins and later `emit` calls are dropped.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::collect::Deliverer;
use crate::error::StreamError;

/// Hot multicast stream: one shared production context, bounded replay.
///
/// Unlike [`ColdStream`](super::ColdStream), values exist independently of
/// subscribers: `emit` records and fans out whether or not anyone listens.
/// Subscriptions observe only values emitted after (or replayed for) their
/// join.
pub struct EventBus<T> {
    inner: Mutex<BusInner<T>>,
}

struct BusInner<T> {
    replay: VecDeque<T>,
    capacity: usize,
    taps: Vec<Deliverer<T>>,
    terminal: Option<Result<(), StreamError>>,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// Creates a bus that replays up to `replay_capacity` recent values to
    /// late subscribers. Capacity `0` disables replay entirely.
    pub fn new(replay_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(BusInner {
                replay: VecDeque::with_capacity(replay_capacity),
                capacity: replay_capacity,
                taps: Vec::new(),
                terminal: None,
            }),
        }
    }

    /// Emits a value to the replay buffer and every live subscription.
    ///
    /// - Never blocks: fan-out hands one clone to each subscription's
    ///   delivery cell and returns.
    /// - When the replay buffer is full the oldest value is evicted.
    /// - After `close`/`fail` the value is silently dropped.
    /// - Subscriptions whose consumer is gone are pruned here.
    pub fn emit(&self, value: T) {
        let mut inner = self.locked();
        if inner.terminal.is_some() {
            return;
        }
        if inner.capacity > 0 {
            if inner.replay.len() == inner.capacity {
                inner.replay.pop_front();
            }
            inner.replay.push_back(value.clone());
        }
        inner.taps.retain(|tap| tap.deliver(value.clone()));
    }

    /// Terminates the bus cleanly: every subscription completes without error.
    ///
    /// Idempotent; also a no-op after `fail`.
    pub fn close(&self) {
        self.terminate(Ok(()));
    }

    /// Terminates the bus with a failure that reaches every subscription.
    ///
    /// Hot-stream production is shared, so a fatal producer error is fatal to
    /// the whole stream: each live subscription settles with
    /// [`StreamError::Failed`], and late subscribers receive the replay
    /// contents followed by the same failure.
    pub fn fail(&self, reason: impl Into<String>) {
        self.terminate(Err(StreamError::failed(reason)));
    }

    /// Number of live subscriptions (as of the last emit or attach).
    pub fn subscriber_count(&self) -> usize {
        self.locked().taps.len()
    }

    /// Registers a delivery tap: replays the buffer oldest-first, then either
    /// joins live fan-out or, if the bus already terminated, settles the tap
    /// immediately.
    ///
    /// Holding the lock across replay and registration means a concurrent
    /// `emit` lands either in the replay pass or in live fan-out, exactly
    /// once.
    pub(crate) fn attach(&self, tap: Deliverer<T>) {
        let mut inner = self.locked();
        for value in inner.replay.iter() {
            tap.deliver(value.clone());
        }
        match &inner.terminal {
            Some(result) => tap.finish(result.clone()),
            None => inner.taps.push(tap),
        }
    }

    fn terminate(&self, result: Result<(), StreamError>) {
        let taps = {
            let mut inner = self.locked();
            if inner.terminal.is_some() {
                return;
            }
            inner.terminal = Some(result.clone());
            std::mem::take(&mut inner.taps)
        };
        for tap in taps {
            tap.finish(result.clone());
        }
    }

    fn locked(&self) -> MutexGuard<'_, BusInner<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{link, CollectPolicy, Intake, Msg};

    fn drain(mut intake: Intake<i32>) -> (Vec<i32>, Option<Result<(), StreamError>>) {
        let mut values = Vec::new();
        let mut terminal = None;
        if let Intake::Fifo(rx) = &mut intake {
            while let Ok(msg) = rx.try_recv() {
                match msg {
                    Msg::Item(v) => values.push(v),
                    Msg::End(res) => terminal = Some(res),
                }
            }
        }
        (values, terminal)
    }

    #[test]
    fn test_late_subscriber_gets_last_k_oldest_first() {
        let bus = EventBus::new(3);
        for v in 1..=5 {
            bus.emit(v);
        }

        let (tap, intake) = link(CollectPolicy::Buffered);
        bus.attach(tap);

        let (values, terminal) = drain(intake);
        assert_eq!(values, vec![3, 4, 5]);
        assert_eq!(terminal, None);
    }

    #[test]
    fn test_capacity_zero_disables_replay() {
        let bus = EventBus::new(0);
        bus.emit(1);
        bus.emit(2);

        let (tap, intake) = link(CollectPolicy::Buffered);
        bus.attach(tap);
        bus.emit(3);

        let (values, _) = drain(intake);
        assert_eq!(values, vec![3]);
    }

    #[test]
    fn test_every_live_tap_sees_every_emission() {
        let bus = EventBus::new(2);
        let (tap_a, intake_a) = link(CollectPolicy::Buffered);
        let (tap_b, intake_b) = link(CollectPolicy::Buffered);
        bus.attach(tap_a);
        bus.emit(1);
        bus.attach(tap_b);
        bus.emit(2);

        let (values_a, _) = drain(intake_a);
        let (values_b, _) = drain(intake_b);
        assert_eq!(values_a, vec![1, 2]);
        // Second tap joined after the first emission: replay covers it.
        assert_eq!(values_b, vec![1, 2]);
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_fail_reaches_every_subscription() {
        let bus = EventBus::new(1);
        let (tap_a, intake_a) = link(CollectPolicy::Buffered);
        let (tap_b, intake_b) = link(CollectPolicy::Buffered);
        bus.attach(tap_a);
        bus.attach(tap_b);
        bus.emit(9);
        bus.fail("producer broke");

        for intake in [intake_a, intake_b] {
            let (values, terminal) = drain(intake);
            assert_eq!(values, vec![9]);
            assert_eq!(terminal, Some(Err(StreamError::failed("producer broke"))));
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_emit_after_close_is_dropped() {
        let bus = EventBus::new(3);
        bus.emit(1);
        bus.close();
        bus.emit(2);

        let (tap, intake) = link(CollectPolicy::Buffered);
        bus.attach(tap);

        let (values, terminal) = drain(intake);
        assert_eq!(values, vec![1]);
        assert_eq!(terminal, Some(Ok(())));
    }

    #[test]
    fn test_first_terminal_wins() {
        let bus = EventBus::new(1);
        bus.close();
        bus.fail("late");

        let (tap, intake) = link(CollectPolicy::Buffered);
        bus.attach(tap);

        let (_, terminal) = drain(intake);
        assert_eq!(terminal, Some(Ok(())));
    }

    #[test]
    fn test_dead_taps_are_pruned_on_emit() {
        let bus = EventBus::new(1);
        let (tap, intake) = link::<i32>(CollectPolicy::Buffered);
        bus.attach(tap);
        assert_eq!(bus.subscriber_count(), 1);

        drop(intake);
        bus.emit(1);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
