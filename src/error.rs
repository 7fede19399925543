//! Error types used by the stream engine and its subscriptions.
//!
//! This module defines two main error enums:
//!
//! - [`EngineError`] — errors raised by the orchestration layer itself.
//! - [`StreamError`] — errors and control signals raised by streams, producers,
//!   and consumer actions.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging,
//! and [`StreamError::is_cancellation`] distinguishes control signals from
//! reportable failures.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the orchestration layer.
///
/// These represent failures of the engine itself rather than of any single
/// stream: a shutdown overrunning its grace window, or a failure to bring up
/// the dedicated UI-affinity runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    /// Shutdown grace period was exceeded; some subscriptions remained stuck
    /// and had to be force-terminated.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the tasks/subscriptions that did not stop in time.
        stuck: Vec<String>,
    },

    /// The dedicated UI-affinity runtime could not be started.
    #[error("failed to start ui runtime: {0}")]
    UiRuntime(#[from] std::io::Error),
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use streamvisor::EngineError;
    /// use std::time::Duration;
    ///
    /// let err = EngineError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "engine_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::GraceExceeded { .. } => "engine_grace_exceeded",
            EngineError::UiRuntime(_) => "engine_ui_runtime",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            EngineError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck subscriptions={stuck:?}")
            }
            EngineError::UiRuntime(err) => format!("ui runtime: {err}"),
        }
    }
}

/// # Errors and control signals produced by streams.
///
/// Two of the variants are control signals rather than failures:
/// [`StreamError::Canceled`] ends a run because its owning scope was cancelled,
/// and [`StreamError::Closed`] ends a producer because its subscriber is gone.
/// Subscriptions that terminate through either resolve gracefully; neither is
/// ever surfaced as a failure.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The stream completed without emitting a single value.
    ///
    /// Raised only by `reduce`; `fold` returns its seed instead.
    #[error("stream completed without emitting any value")]
    Empty,

    /// The owning scope or subscription was cancelled at a suspension point.
    #[error("cancelled by owning scope")]
    Canceled,

    /// The subscriber side of the stream is gone; the producer should unwind.
    #[error("subscriber is gone")]
    Closed,

    /// Producer logic failed.
    ///
    /// For a cold stream this terminates the failing run only; concurrent runs
    /// of the same stream are untouched. For a hot stream the single shared
    /// production context is gone, so the failure is reported to every
    /// subscriber.
    #[error("stream failed: {reason}")]
    Failed {
        /// Human-readable failure description.
        reason: String,
    },
}

impl StreamError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use streamvisor::StreamError;
    ///
    /// assert_eq!(StreamError::Empty.as_label(), "stream_empty");
    /// assert_eq!(StreamError::Canceled.as_label(), "stream_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamError::Empty => "stream_empty",
            StreamError::Canceled => "stream_canceled",
            StreamError::Closed => "stream_closed",
            StreamError::Failed { .. } => "stream_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            StreamError::Empty => "completed without values".to_string(),
            StreamError::Canceled => "cancelled".to_string(),
            StreamError::Closed => "subscriber gone".to_string(),
            StreamError::Failed { reason } => format!("failed: {reason}"),
        }
    }

    /// True for the control signals that end a run without a reportable failure.
    ///
    /// Returns `true` for [`StreamError::Canceled`] and [`StreamError::Closed`],
    /// `false` otherwise.
    ///
    /// # Example
    /// ```
    /// use streamvisor::StreamError;
    ///
    /// assert!(StreamError::Canceled.is_cancellation());
    /// assert!(StreamError::Closed.is_cancellation());
    /// assert!(!StreamError::Empty.is_cancellation());
    /// ```
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StreamError::Canceled | StreamError::Closed)
    }

    /// Shorthand for [`StreamError::Failed`] from any displayable reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        StreamError::Failed {
            reason: reason.into(),
        }
    }
}
