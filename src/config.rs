//! # Global engine configuration.
//!
//! Provides [`Config`], centralized settings for the stream engine.
//!
//! Config is used in two ways:
//! 1. **Orchestrator creation**: `Orchestrator::new(config, scheduler)`
//! 2. **EventBus defaults**: `Orchestrator::event_bus()` uses `replay_capacity`
//!
//! ## Sentinel values
//! - `grace = 0s` → shutdown does not wait (cancel and return immediately)
//! - `replay_capacity = 0` → buses created from this config keep no replay

use std::time::Duration;

/// Global configuration for the stream engine.
///
/// Defines:
/// - **Shutdown behavior**: grace period for cooperative termination
/// - **Replay defaults**: how many past events a new bus retains
///
/// ## Field semantics
/// - `grace`: Maximum wait for subscriptions to stop cooperatively
///   (`0s` = no wait, force immediately)
/// - `replay_capacity`: Events retained for late bus subscribers (`0` = none)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for cooperative shutdown before force-terminating.
    ///
    /// When `Orchestrator::shutdown` runs:
    /// - Subscriptions and tasks are cancelled via their tokens
    /// - The orchestrator waits up to `grace` for them to exit
    /// - If the window is exceeded, stragglers are aborted and
    ///   `EngineError::GraceExceeded` is returned
    pub grace: Duration,

    /// How many of the most recent events a bus replays to late subscribers.
    ///
    /// Applied by `Orchestrator::event_bus()`. Individual buses can still be
    /// constructed with an explicit capacity.
    pub replay_capacity: usize,
}

impl Config {
    /// Returns the shutdown grace window as an `Option`.
    ///
    /// - `None` → do not wait, force immediately
    /// - `Some(d)` → wait up to `d` for subscriptions to stop
    #[inline]
    pub fn grace_window(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 5s` (reasonable cooperative shutdown window)
    /// - `replay_capacity = 5` (small late-subscriber catch-up window)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
            replay_capacity: 5,
        }
    }
}
