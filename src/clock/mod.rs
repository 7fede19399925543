//! Time sources: real and virtual.
//!
//! Every suspending delay in the engine goes through the [`Clock`] trait, so
//! swapping the wall clock for a test clock changes nothing else in the
//! wiring.
//!
//! ## Contents
//! - [`Clock`] injectable delay primitive (`Arc<dyn Clock>` via [`ClockRef`])
//! - [`TokioClock`] real time, backed by the tokio timer
//! - [`VirtualClock`] manually advanced time for deterministic tests
//!
//! ## Quick wiring
//! ```text
//! Scheduler { clock: ClockRef }
//!      └─► StreamCtx::delay() ── producers, consumers, demos
//!           - production: TokioClock (real sleeps)
//!           - tests:      VirtualClock (advance() / run_pending())
//! ```

mod clock;
mod virtual_clock;

pub use clock::{Clock, ClockRef, TokioClock};
pub use virtual_clock::VirtualClock;
