//! Stream primitives: cold producers, hot state, replaying bus.
//!
//! This module groups the three source types the engine exposes. They differ
//! in when production happens and what late subscribers observe:
//!
//! ## Contents
//! - [`ColdStream`] lazy producer; a fresh run per subscription, nothing
//!   happens until someone subscribes
//! - [`StateHolder`] always-valued conflated state; late subscribers get the
//!   current value immediately
//! - [`EventBus`] multicast events; late subscribers get the last `N`
//!   retained events, then live ones
//!
//! ## Quick reference
//! ```text
//!                 start of production      late subscriber sees
//! ColdStream      at subscribe (per-sub)   everything (own run)
//! StateHolder     value exists up front    current value, then changes
//! EventBus        emit() by producers      last N replayed, then live
//! ```

mod bus;
mod cold;
mod state;

pub use bus::EventBus;
pub use cold::{ColdStream, Emitter};
pub use state::StateHolder;

pub(crate) use cold::{EmitFuture, SinkFn};
