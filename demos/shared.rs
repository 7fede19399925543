//! # Example: shared
//!
//! Demonstrates the two hot primitives: a conflated state holder observed by
//! a slow viewer, and an event bus replaying recent history to late
//! subscribers.
//!
//! Shows how to:
//! - Observe a [`StateHolder`]: seeded with the current value, conflated
//!   when the consumer falls behind
//! - Run the viewer on the dedicated `Ui` lane (one serialized thread)
//! - Emit into an [`EventBus`] before anyone listens and let replay catch
//!   late subscribers up
//! - Feed two subscribers with different pacing from the same bus
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► observe(counter, viewer@Ui)    seeded with 0
//!   ├─► run_in(incrementer)            +1 every 40ms, five times
//!   │     └─► viewer (100ms/value)     conflates the burst, lands on 5
//!   ├─► bus.emit x4                    replay keeps the last 3
//!   ├─► listen(first)                  replay: 3 events, then live
//!   ├─► listen(second, later)          replay catches it up too
//!   └─► bus.close()                    both subscriptions settle Ok
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example shared
//! ```

use std::sync::Arc;
use std::time::Duration;

use streamvisor::{
    CollectOptions, Config, ConsumeFn, EventBus, ExecContext, Orchestrator, Scheduler,
    StateHolder, StreamCtx, StreamError, TokioClock,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=== shared example ===\n");

    // 1. Configure the engine: small replay window, dedicated Ui lane.
    let mut cfg = Config::default();
    cfg.replay_capacity = 3;
    let scheduler = Arc::new(Scheduler::new(Arc::new(TokioClock))?);
    let orch = Orchestrator::new(cfg, scheduler);
    let scope = orch.scope();

    // 2. State: a counter observed by a slow viewer on the Ui lane.
    let counter = Arc::new(StateHolder::new(0u32));
    let viewer = ConsumeFn::arc("viewer", |v: u32, ctx: StreamCtx| async move {
        let thread = std::thread::current().name().unwrap_or("?").to_owned();
        println!("[viewer] counter = {v} (on {thread})");
        // Slower than the writer: intermediate values conflate away.
        ctx.delay(Duration::from_millis(100)).await?;
        Ok::<_, StreamError>(())
    });
    let _viewer_sub = orch.observe(
        &scope,
        &counter,
        CollectOptions::conflated().on(ExecContext::Ui),
        viewer,
    );

    // 3. A scoped task bumps the counter five times.
    let incrementer = orch.run_in(&scope, "incrementer", ExecContext::Background, {
        let counter = counter.clone();
        move |ctx: StreamCtx| async move {
            for _ in 0..5 {
                if ctx.delay(Duration::from_millis(40)).await.is_err() {
                    return;
                }
                counter.update(|n| *n += 1);
            }
        }
    });
    incrementer.done().await;
    tokio::time::sleep(Duration::from_millis(250)).await;
    println!("[main] final counter = {}\n", counter.get());

    // 4. Events: fill the bus before anyone is listening.
    let bus: EventBus<String> = orch.event_bus();
    for line in ["doors open", "menu posted", "chef arrived", "ovens hot"] {
        bus.emit(line.to_string());
        println!("[bus] emitted \"{line}\"");
    }

    // 5. First subscriber joins late: replay delivers the last 3, oldest first.
    println!("\n[main] first subscriber joins (catches up from replay):");
    let first = orch.listen(
        &scope,
        &bus,
        CollectOptions::buffered(),
        ConsumeFn::arc("first", |line: String, ctx: StreamCtx| async move {
            println!("[first]  {line}");
            ctx.delay(Duration::from_millis(30)).await?;
            Ok::<_, StreamError>(())
        }),
    );

    // Optional: mirror every bus event to stdout (requires "logging" feature).
    #[cfg(feature = "logging")]
    let _mirror = {
        use streamvisor::LogSink;
        orch.listen(&scope, &bus, CollectOptions::buffered(), LogSink::arc("mirror"))
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    bus.emit("service started".to_string());
    println!(
        "[bus] emitted \"service started\" ({} live subscriber(s))",
        bus.subscriber_count()
    );

    // 6. A second, slower subscriber joins even later.
    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("\n[main] second subscriber joins:");
    let second = orch.listen(
        &scope,
        &bus,
        CollectOptions::buffered(),
        ConsumeFn::arc("second", |line: String, ctx: StreamCtx| async move {
            println!("[second] {line}");
            ctx.delay(Duration::from_millis(80)).await?;
            Ok::<_, StreamError>(())
        }),
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    bus.emit("last call".to_string());

    // 7. Closing the bus settles every subscription cleanly.
    bus.close();
    first.done().await?;
    second.done().await?;
    println!("\n[main] bus closed, both subscribers settled");

    // The viewer never completes on its own; shutdown tears the scope down.
    match orch.shutdown(scope).await {
        Ok(()) => println!("[orchestrator] stopped gracefully"),
        Err(e) => println!("[orchestrator] stopped with error: {e}"),
    }
    Ok(())
}
