//! # Backpressure policies for subscriptions.
//!
//! [`CollectPolicy`] decides what happens when a producer outpaces a
//! consumer. It is chosen per subscription at subscribe time and never
//! affects the producer's code, only which values reach `on_value` and
//! whether an in-flight action survives a newer value.
//!
//! ## Choosing a policy
//! - [`CollectPolicy::Buffered`]: nothing may be lost. Every value queues and
//!   is processed in order; memory grows with the backlog.
//! - [`CollectPolicy::Conflated`]: only the newest value matters, finish what
//!   you started. Stale queued values are skipped, the running action
//!   completes.
//! - [`CollectPolicy::CollectLatest`]: only the newest value matters, and a
//!   stale action is not worth finishing. Arrival of a newer value cancels
//!   the in-flight action at its next suspension point.
//!
//! with the tie-break rule shared by the two lossy policies: whenever the
//! consumer becomes free, it takes the most recently delivered value, never
//! an older one.

use crate::exec::ExecContext;

/// What to do when values arrive faster than the consumer processes them.
///
/// The set is closed: policy handling inside the worker is an exhaustive
/// `match`, so a new policy is a compile-time decision, not a runtime
/// surprise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollectPolicy {
    /// Lossless: queue every value, process in emission order.
    #[default]
    Buffered,
    /// Lossy: keep only the latest pending value; the running action
    /// finishes undisturbed.
    Conflated,
    /// Lossy: keep only the latest pending value; a newer arrival cancels
    /// the running action at its next suspension point.
    CollectLatest,
}

impl CollectPolicy {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            CollectPolicy::Buffered => "buffered",
            CollectPolicy::Conflated => "conflated",
            CollectPolicy::CollectLatest => "collect_latest",
        }
    }

    /// True for the policies that may skip values.
    pub fn is_lossy(&self) -> bool {
        !matches!(self, CollectPolicy::Buffered)
    }
}

/// Per-subscription options: policy plus execution lane.
///
/// ## Example
/// ```
/// use streamvisor::{CollectOptions, CollectPolicy, ExecContext};
///
/// let opts = CollectOptions::conflated().on(ExecContext::Background);
/// assert_eq!(opts.policy, CollectPolicy::Conflated);
/// assert!(CollectOptions::default().policy == CollectPolicy::Buffered);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectOptions {
    /// Backpressure policy for this subscription.
    pub policy: CollectPolicy,
    /// Lane the producer and consumer run in.
    pub context: ExecContext,
}

impl CollectOptions {
    /// Options with [`CollectPolicy::Buffered`] on the default lane.
    pub fn buffered() -> Self {
        Self {
            policy: CollectPolicy::Buffered,
            ..Self::default()
        }
    }

    /// Options with [`CollectPolicy::Conflated`] on the default lane.
    pub fn conflated() -> Self {
        Self {
            policy: CollectPolicy::Conflated,
            ..Self::default()
        }
    }

    /// Options with [`CollectPolicy::CollectLatest`] on the default lane.
    pub fn collect_latest() -> Self {
        Self {
            policy: CollectPolicy::CollectLatest,
            ..Self::default()
        }
    }

    /// Moves the subscription onto the given lane.
    pub fn on(mut self, context: ExecContext) -> Self {
        self.context = context;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_labels_are_stable() {
        assert_eq!(CollectPolicy::Buffered.as_label(), "buffered");
        assert_eq!(CollectPolicy::Conflated.as_label(), "conflated");
        assert_eq!(CollectPolicy::CollectLatest.as_label(), "collect_latest");
    }

    #[test]
    fn test_lossiness_classification() {
        assert!(!CollectPolicy::Buffered.is_lossy());
        assert!(CollectPolicy::Conflated.is_lossy());
        assert!(CollectPolicy::CollectLatest.is_lossy());
    }

    #[test]
    fn test_options_builders() {
        assert_eq!(CollectOptions::default().policy, CollectPolicy::Buffered);
        assert_eq!(CollectOptions::default().context, ExecContext::Ui);

        let opts = CollectOptions::collect_latest().on(ExecContext::Background);
        assert_eq!(opts.policy, CollectPolicy::CollectLatest);
        assert_eq!(opts.context, ExecContext::Background);
    }
}
