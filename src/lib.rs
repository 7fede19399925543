//! # streamvisor
//!
//! **Streamvisor** is a lightweight asynchronous stream engine for Rust.
//!
//! It provides cold per-subscriber streams, hot state and event sources,
//! consumer-side backpressure policies, and a scope-rooted orchestrator.
//! The clock is injected everywhere, so every timing behavior can be driven
//! deterministically from tests via a virtual clock.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐      ┌──────────────┐      ┌──────────────┐
//!     │  ColdStream  │      │ StateHolder  │      │   EventBus   │
//!     │ (run per sub)│      │ (latest val) │      │(replay+multi)│
//!     └──────┬───────┘      └──────┬───────┘      └──────┬───────┘
//!            │ collect()           │ observe()           │ listen()
//!            ▼                     ▼                     ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Orchestrator (session entry point)                              │
//! │  - Scope (cancellation root + task tracker + abort registry)     │
//! │  - delivery cell per subscription, chosen by CollectPolicy       │
//! │  - Scheduler (Ui / Background lanes, injected Clock)             │
//! └──────┬──────────────────────┬─────────────────────┬─────────────┘
//!        ▼                      ▼                     ▼
//!   [delivery cell]        [delivery cell]       [delivery cell]
//!    Buffered: FIFO         Conflated: slot      CollectLatest: slot
//!        ▼                      ▼                     ▼
//!    worker                 worker                worker
//!        ▼                      ▼                     ▼
//!   Consume::on_value      Consume::on_value     Consume::on_value
//! ```
//!
//! ### Subscription lifecycle
//! ```text
//! subscribe (collect / observe / listen)
//!   ├─► link(policy) ──► (deliverer, intake)
//!   ├─► spawn producer run / watch forwarder / bus tap   (feeds deliverer)
//!   └─► spawn worker (drains intake):
//!         loop {
//!           ├─ token cancelled? ─► settle Ok (no further action starts)
//!           ├─ next value       ─► Consume::on_value(value, ctx)
//!           │     ├─ Ok                    ─► continue
//!           │     ├─ Err(Canceled|Closed)  ─► settle Ok (control signal)
//!           │     └─ Err(other)            ─► settle Err (subscription failed)
//!           └─ End(result)      ─► settle result
//!         }
//!
//! Teardown: Scope::cancel() / Orchestrator::shutdown(scope)
//!   - pending delays resolve into cancellation
//!   - in-flight actions stop at their next suspension point
//!   - shutdown waits up to Config::grace, then reports stuck tasks
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                          |
//! |-------------------|------------------------------------------------------------------|---------------------------------------------|
//! | **Streams**       | Cold per-subscriber producers, conflated state, replaying bus.  | [`ColdStream`], [`StateHolder`], [`EventBus`] |
//! | **Backpressure**  | Buffered / conflated / collect-latest, chosen per subscription. | [`CollectPolicy`], [`CollectOptions`]       |
//! | **Consumers**     | Named async callbacks driven by the policy worker.              | [`Consume`], [`ConsumeFn`], [`ConsumeRef`]  |
//! | **Scheduling**    | Two lanes plus an injectable clock; virtual clock for tests.    | [`Scheduler`], [`ExecContext`], [`Clock`], [`VirtualClock`] |
//! | **Orchestration** | Scope-rooted lifecycle, graceful shutdown with stuck reporting. | [`Orchestrator`], [`Scope`], [`Subscription`] |
//! | **Errors**        | Typed stream and engine errors.                                 | [`StreamError`], [`EngineError`]            |
//! | **Configuration** | Centralized session settings.                                   | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogSink`] consumer _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use streamvisor::{
//!     ColdStream, CollectOptions, Config, ConsumeFn, Orchestrator, Scheduler, StreamCtx,
//!     StreamError, TokioClock,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = Arc::new(Scheduler::current_thread(Arc::new(TokioClock)));
//!     let orch = Orchestrator::new(Config::default(), scheduler);
//!     let scope = orch.scope();
//!
//!     // Countdown stream: 3, 2, 1, 0 with a tick between values.
//!     // Cold: every collector below gets its own run from 3.
//!     let countdown = ColdStream::new(|em| async move {
//!         let mut v = 3u32;
//!         em.emit(v).await?;
//!         while v > 0 {
//!             em.delay(Duration::from_millis(10)).await?;
//!             v -= 1;
//!             em.emit(v).await?;
//!         }
//!         Ok(())
//!     });
//!
//!     // Terminal operators pull a full independent run.
//!     let ctx = orch.scheduler().stream_ctx(scope.token().child_token());
//!     let even_sum = countdown
//!         .clone()
//!         .filter(|v| v % 2 == 0)
//!         .reduce(&ctx, |acc, v| acc + v)
//!         .await?;
//!     assert_eq!(even_sum, 2);
//!
//!     // Subscriptions run under the scope with a backpressure policy.
//!     let sub = orch.collect(
//!         &scope,
//!         &countdown,
//!         CollectOptions::buffered(),
//!         ConsumeFn::arc("printer", |v: u32, _ctx: StreamCtx| async move {
//!             println!("tick {v}");
//!             Ok::<_, StreamError>(())
//!         }),
//!     );
//!     sub.done().await?;
//!
//!     orch.shutdown(scope).await?;
//!     Ok(())
//! }
//! ```
mod clock;
mod collect;
mod config;
mod core;
mod error;
mod exec;
mod streams;

// ---- Public re-exports ----

pub use clock::{Clock, ClockRef, TokioClock, VirtualClock};
pub use collect::{CollectOptions, CollectPolicy, Consume, ConsumeFn, ConsumeRef, Subscription};
pub use config::Config;
pub use core::{Orchestrator, Scope};
pub use error::{EngineError, StreamError};
pub use exec::{ExecContext, Scheduler, StreamCtx, TaskHandle};
pub use streams::{ColdStream, Emitter, EventBus, StateHolder};

// Optional: expose a simple built-in printing consumer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use collect::LogSink;
