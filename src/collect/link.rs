//! # Delivery cells between a producer and its subscription worker.
//!
//! [`link`] builds the cell matching a [`CollectPolicy`] and returns its two
//! ends: the producer-side [`Deliverer`] and the worker-side [`Intake`].
//!
//! Two cell shapes cover the three policies:
//! - **Queue** (`Buffered`): an unbounded FIFO; every value survives until
//!   the worker drains it.
//! - **Slot** (`Conflated`, `CollectLatest`): a single latest-value slot; a
//!   new delivery overwrites an unconsumed one. The slot also counts
//!   deliveries, which is how the collect-latest worker detects that its
//!   running action went stale.
//!
//! ## Rules
//! - `deliver` never blocks and never fails the producer; it returns `false`
//!   once the worker is gone, and the producer unwinds with `Closed`.
//! - The terminal outcome travels through the cell too: the worker sees it
//!   only after every value it is still meant to process.
//! - Dropping the producer end without an explicit terminal counts as a
//!   clean close; dropping the worker end marks the consumer gone.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::sync::Notify;

use crate::collect::policy::CollectPolicy;
use crate::error::StreamError;

/// Producer → worker message on the buffered path.
pub(crate) enum Msg<T> {
    /// One delivered value.
    Item(T),
    /// Terminal outcome of the producing side.
    End(Result<(), StreamError>),
}

/// Builds the delivery cell for a policy and returns both ends.
pub(crate) fn link<T>(policy: CollectPolicy) -> (Deliverer<T>, Intake<T>) {
    match policy {
        CollectPolicy::Buffered => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Deliverer::Queue(tx), Intake::Fifo(rx))
        }
        CollectPolicy::Conflated | CollectPolicy::CollectLatest => {
            let cell = Arc::new(SlotCell::new());
            (
                Deliverer::Slot(Arc::new(SlotSender { cell: cell.clone() })),
                Intake::Latest {
                    slot: SlotIntake { cell },
                    restart: policy == CollectPolicy::CollectLatest,
                },
            )
        }
    }
}

/// Producer-side handle of a delivery cell.
pub(crate) enum Deliverer<T> {
    Queue(mpsc::UnboundedSender<Msg<T>>),
    Slot(Arc<SlotSender<T>>),
}

impl<T> Clone for Deliverer<T> {
    fn clone(&self) -> Self {
        match self {
            Deliverer::Queue(tx) => Deliverer::Queue(tx.clone()),
            Deliverer::Slot(slot) => Deliverer::Slot(slot.clone()),
        }
    }
}

impl<T> Deliverer<T> {
    /// Hands one value to the cell.
    ///
    /// Returns `false` once the worker side is gone or the cell already
    /// carries a terminal outcome.
    pub(crate) fn deliver(&self, value: T) -> bool {
        match self {
            Deliverer::Queue(tx) => tx.send(Msg::Item(value)).is_ok(),
            Deliverer::Slot(slot) => slot.cell.deliver(value),
        }
    }

    /// Publishes the terminal outcome. The first call wins.
    pub(crate) fn finish(&self, result: Result<(), StreamError>) {
        match self {
            Deliverer::Queue(tx) => {
                let _ = tx.send(Msg::End(result));
            }
            Deliverer::Slot(slot) => slot.cell.finish(result),
        }
    }
}

/// Worker-side handle of a delivery cell.
pub(crate) enum Intake<T> {
    Fifo(mpsc::UnboundedReceiver<Msg<T>>),
    Latest { slot: SlotIntake<T>, restart: bool },
}

/// Owning wrapper for the producer side of a slot cell.
///
/// Held behind an `Arc` inside [`Deliverer`], so the drop hook runs exactly
/// once, when the last producer handle goes away.
pub(crate) struct SlotSender<T> {
    cell: Arc<SlotCell<T>>,
}

impl<T> Drop for SlotSender<T> {
    fn drop(&mut self) {
        // Producer vanished without a terminal (e.g. aborted): clean close.
        self.cell.finish(Ok(()));
    }
}

/// Owning wrapper for the worker side of a slot cell.
pub(crate) struct SlotIntake<T> {
    cell: Arc<SlotCell<T>>,
}

impl<T> SlotIntake<T> {
    /// Takes the pending value, the terminal outcome, or reports idle.
    pub(crate) fn take(&self) -> SlotStep<T> {
        self.cell.take()
    }

    /// Resolves on the next delivery or terminal.
    pub(crate) async fn notified(&self) {
        self.cell.notify.notified().await;
    }

    /// Resolves once a delivery newer than `seen` has arrived.
    ///
    /// Tolerates stale wakeups: a stored notify permit from the delivery that
    /// was just taken only causes a re-check, never a false positive.
    pub(crate) async fn superseded(&self, seen: u64) {
        loop {
            self.cell.notify.notified().await;
            if self.cell.locked().seq > seen {
                return;
            }
        }
    }
}

impl<T> Drop for SlotIntake<T> {
    fn drop(&mut self) {
        self.cell.locked().consumer_gone = true;
    }
}

/// One step of draining a slot cell.
pub(crate) enum SlotStep<T> {
    /// A value and the delivery counter at the moment it was taken.
    Value(T, u64),
    /// The producing side finished with this outcome.
    End(Result<(), StreamError>),
    /// Nothing pending yet.
    Idle,
}

/// Latest-value slot shared by both ends.
struct SlotCell<T> {
    state: Mutex<SlotState<T>>,
    notify: Notify,
}

struct SlotState<T> {
    pending: Option<T>,
    seq: u64,
    terminal: Option<Result<(), StreamError>>,
    consumer_gone: bool,
}

impl<T> SlotCell<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                pending: None,
                seq: 0,
                terminal: None,
                consumer_gone: false,
            }),
            notify: Notify::new(),
        }
    }

    fn locked(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn deliver(&self, value: T) -> bool {
        {
            let mut st = self.locked();
            if st.terminal.is_some() || st.consumer_gone {
                return false;
            }
            // Overwriting an unconsumed value is the conflation.
            st.pending = Some(value);
            st.seq += 1;
        }
        self.notify.notify_one();
        true
    }

    fn finish(&self, result: Result<(), StreamError>) {
        {
            let mut st = self.locked();
            if st.terminal.is_some() {
                return;
            }
            st.terminal = Some(result);
        }
        self.notify.notify_one();
    }

    fn take(&self) -> SlotStep<T> {
        let mut st = self.locked();
        if let Some(value) = st.pending.take() {
            SlotStep::Value(value, st.seq)
        } else if let Some(result) = st.terminal.clone() {
            SlotStep::End(result)
        } else {
            SlotStep::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_pair<T>() -> (Deliverer<T>, SlotIntake<T>, bool) {
        match link::<T>(CollectPolicy::Conflated) {
            (d, Intake::Latest { slot, restart }) => (d, slot, restart),
            _ => panic!("conflated link must build a slot cell"),
        }
    }

    #[test]
    fn test_slot_keeps_only_the_latest_value() {
        let (deliverer, intake, restart) = slot_pair();
        assert!(!restart);

        assert!(deliverer.deliver(1));
        assert!(deliverer.deliver(2));
        assert!(deliverer.deliver(3));

        match intake.take() {
            SlotStep::Value(v, seq) => {
                assert_eq!(v, 3);
                assert_eq!(seq, 3);
            }
            _ => panic!("expected a pending value"),
        }
        assert!(matches!(intake.take(), SlotStep::Idle));
    }

    #[test]
    fn test_slot_serves_pending_value_before_terminal() {
        let (deliverer, intake, _) = slot_pair();

        assert!(deliverer.deliver(7));
        deliverer.finish(Ok(()));

        assert!(matches!(intake.take(), SlotStep::Value(7, _)));
        assert!(matches!(intake.take(), SlotStep::End(Ok(()))));
    }

    #[test]
    fn test_slot_rejects_delivery_after_terminal() {
        let (deliverer, intake, _) = slot_pair();

        deliverer.finish(Err(StreamError::failed("boom")));
        assert!(!deliverer.deliver(1));

        match intake.take() {
            SlotStep::End(Err(StreamError::Failed { reason })) => assert_eq!(reason, "boom"),
            _ => panic!("expected the failure terminal"),
        }
    }

    #[test]
    fn test_slot_first_terminal_wins() {
        let (deliverer, intake, _) = slot_pair::<i32>();

        deliverer.finish(Ok(()));
        deliverer.finish(Err(StreamError::failed("late")));

        assert!(matches!(intake.take(), SlotStep::End(Ok(()))));
    }

    #[test]
    fn test_slot_detects_dropped_worker() {
        let (deliverer, intake, _) = slot_pair();

        assert!(deliverer.deliver(1));
        drop(intake);
        assert!(!deliverer.deliver(2));
    }

    #[test]
    fn test_dropping_producer_closes_cleanly() {
        let (deliverer, intake, _) = slot_pair::<i32>();

        drop(deliverer);
        assert!(matches!(intake.take(), SlotStep::End(Ok(()))));
    }

    #[tokio::test]
    async fn test_superseded_ignores_the_taken_delivery() {
        let (deliverer, intake, _) = slot_pair();

        assert!(deliverer.deliver(1));
        let seen = match intake.take() {
            SlotStep::Value(_, seq) => seq,
            _ => panic!("expected a pending value"),
        };

        // A stale permit may exist; without a newer delivery this must hang.
        let wait = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            intake.superseded(seen),
        );
        assert!(wait.await.is_err());

        assert!(deliverer.deliver(2));
        intake.superseded(seen).await;
    }

    #[test]
    fn test_queue_preserves_order_and_terminal() {
        let (deliverer, intake) = link::<i32>(CollectPolicy::Buffered);
        let mut rx = match intake {
            Intake::Fifo(rx) => rx,
            _ => panic!("buffered link must build a queue"),
        };

        for v in [1, 2, 3] {
            assert!(deliverer.deliver(v));
        }
        deliverer.finish(Ok(()));

        let mut values = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            match msg {
                Msg::Item(v) => values.push(v),
                Msg::End(res) => {
                    assert_eq!(res, Ok(()));
                    break;
                }
            }
        }
        assert_eq!(values, vec![1, 2, 3]);
    }
}
