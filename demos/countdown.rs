//! # Example: countdown
//!
//! Demonstrates cold streams end to end: lazy producers, operator chains,
//! and terminal collectors.
//!
//! Shows how to:
//! - Build a [`ColdStream`] that emits a countdown on the engine clock
//! - Chain `filter` / `map` / `flat_map_concat` without touching the producer
//! - Subscribe through [`Orchestrator::collect`] with a named consumer
//! - Drive `count` / `reduce` / `fold` terminals directly on a [`StreamCtx`]
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► build countdown stream         (nothing runs yet)
//!   ├─► orch.collect(printer)          10 9 8 ... 0
//!   ├─► filter(even).map(square)       100 64 36 16 4 0
//!   ├─► requests.flat_map_concat(..)   "1: first" "1: second" "2: first" ...
//!   └─► count / reduce / fold          each terminal drives its own run
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example countdown
//! ```

use std::sync::Arc;
use std::time::Duration;

use streamvisor::{
    ColdStream, CollectOptions, Config, ConsumeFn, Orchestrator, Scheduler, StreamCtx,
    StreamError, TokioClock,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("=== countdown example ===\n");

    // 1. Engine: real clock, both lanes mapped onto this runtime.
    let scheduler = Arc::new(Scheduler::current_thread(Arc::new(TokioClock)));
    let orch = Orchestrator::new(Config::default(), scheduler);
    let scope = orch.scope();

    // 2. A cold stream: constructing it runs nothing.
    let countdown = ColdStream::new(|em| async move {
        let mut v = 10u32;
        em.emit(v).await?;
        while v > 0 {
            em.delay(Duration::from_millis(100)).await?;
            v -= 1;
            em.emit(v).await?;
        }
        Ok(())
    });
    println!("[main] stream built, no producer is running yet");

    // 3. Collecting starts a fresh producer run for this subscription.
    let sub = orch.collect(
        &scope,
        &countdown,
        CollectOptions::buffered(),
        ConsumeFn::arc("printer", |v: u32, _ctx: StreamCtx| async move {
            println!("[printer] tick {v}");
            Ok::<_, StreamError>(())
        }),
    );
    sub.done().await?;

    // 4. Operators rewire the values; the producer code is untouched.
    println!("\n[main] same stream through filter(even).map(square):");
    let squares = countdown.clone().filter(|v| v % 2 == 0).map(|v| v * v);
    let sub = orch.collect(
        &scope,
        &squares,
        CollectOptions::buffered(),
        ConsumeFn::arc("squares", |v: u32, _ctx: StreamCtx| async move {
            println!("[squares] {v}");
            Ok::<_, StreamError>(())
        }),
    );
    sub.done().await?;

    // 5. flat_map_concat drains each inner stream before the outer resumes.
    println!("\n[main] three requests, each expanded to a two-phase inner stream:");
    let requests = ColdStream::new(|em| async move {
        for i in 1..=3u32 {
            em.emit(i).await?;
            em.delay(Duration::from_millis(100)).await?;
        }
        Ok(())
    });
    let phased = requests.flat_map_concat(|i| {
        ColdStream::new(move |em| async move {
            em.emit(format!("{i}: first")).await?;
            em.delay(Duration::from_millis(50)).await?;
            em.emit(format!("{i}: second")).await?;
            Ok(())
        })
    });
    let sub = orch.collect(
        &scope,
        &phased,
        CollectOptions::buffered(),
        ConsumeFn::arc("phased", |line: String, _ctx: StreamCtx| async move {
            println!("[phased] {line}");
            Ok::<_, StreamError>(())
        }),
    );
    sub.done().await?;

    // 6. Terminal collectors drive their own run on a plain StreamCtx.
    let ctx = orch.scheduler().stream_ctx(scope.token().child_token());
    let evens = countdown.count(&ctx, |v| v % 2 == 0).await?;
    let sum = countdown.reduce(&ctx, |acc, v| acc + v).await?;
    let trace = countdown
        .fold(&ctx, String::new(), |mut acc, v| {
            if !acc.is_empty() {
                acc.push(' ');
            }
            acc.push_str(&v.to_string());
            acc
        })
        .await?;
    println!("\n[terminals] even values: {evens}");
    println!("[terminals] sum via reduce: {sum}");
    println!("[terminals] fold trace: {trace}");

    // 7. Tear the session down.
    match orch.shutdown(scope).await {
        Ok(()) => println!("\n[orchestrator] stopped gracefully"),
        Err(e) => println!("\n[orchestrator] stopped with error: {e}"),
    }
    Ok(())
}
