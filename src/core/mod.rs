//! Engine core: session orchestration and teardown.
//!
//! The public API from this module is [`Orchestrator`] plus the [`Scope`] it
//! hands out. Everything the engine spawns goes through here, so cancelling a
//! scope (or shutting the session down) is the single teardown story.
//!
//! Internal layout:
//! - [`orchestrator`]: subscribe entry points (`collect`/`observe`/`listen`),
//!   ad-hoc tasks, graceful shutdown;
//! - [`scope`]: cancellation scope owning tokens, tracked futures and abort
//!   handles.

mod orchestrator;
mod scope;

pub use orchestrator::Orchestrator;
pub use scope::Scope;
