//! Execution layer: contexts, scheduler, and the per-task context handle.
//!
//! This module decides *where* engine work runs and hands each unit of work
//! the pair it needs to cooperate: a clock and a cancellation token.
//!
//! ## Contents
//! - [`ExecContext`] which lane a task runs in (`Ui` serialized / `Background`)
//! - [`Scheduler`] spawns futures onto a lane and owns the engine clock
//! - [`TaskHandle`] cancelable handle for a scheduled task
//! - [`StreamCtx`] clock + token bundle passed into producers and consumers
//!
//! ## Quick wiring
//! ```text
//! Scheduler { clock, ui? }
//!    ├─ spawn(Ui, fut)         → dedicated single-thread runtime (ordered)
//!    ├─ spawn(Background, fut) → ambient tokio runtime
//!    └─ schedule(ctx, parent, f) → TaskHandle { token, join }
//!                                    └─► f(StreamCtx { clock, token })
//! ```
//!
//! See `core/mod.rs` for how the orchestrator drives this layer.

mod context;
mod ctx;
mod scheduler;

pub use context::ExecContext;
pub use ctx::StreamCtx;
pub use scheduler::{Scheduler, TaskHandle};
