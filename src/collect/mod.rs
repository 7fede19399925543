//! Consumer side of a subscription: policies, delivery cells, workers.
//!
//! Every orchestrated subscription is the same sandwich: a producer feeds a
//! **delivery cell**, a **worker** drains the cell and runs the consumer, and
//! the [`CollectPolicy`] picks which cell sits in the middle.
//!
//! ## Contents
//! - [`Consume`] / [`ConsumeFn`] / [`ConsumeRef`] the consumer abstraction
//! - [`CollectPolicy`] buffered / conflated / collect-latest
//! - [`CollectOptions`] policy + execution lane for one subscription
//! - [`Subscription`] handle: cancel and await the outcome
//! - [`LogSink`] ready-made printing consumer (feature `logging`)
//!
//! ## Diagram
//! ```text
//!   producer ─ deliver(v) ─► [cell]            ─► worker ─► Consume::on_value
//!                     Buffered:      FIFO queue     drain in order
//!                     Conflated:     latest slot    skip stale values
//!                     CollectLatest: latest slot    abort in-flight action
//! ```
//!
//! Producers never block in `deliver`; pace differences are absorbed by the
//! cell according to the policy.

mod consume;
mod link;
mod policy;
mod subscription;
mod worker;

pub use consume::{Consume, ConsumeFn, ConsumeRef};
#[cfg(feature = "logging")]
pub use consume::LogSink;
pub use policy::{CollectOptions, CollectPolicy};
pub use subscription::Subscription;

pub(crate) use link::{link, Deliverer, Intake, Msg};
pub(crate) use worker::run_consumer;
