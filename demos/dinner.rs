//! # Example: dinner
//!
//! Serves the same three-course stream to a slow diner under each
//! backpressure policy, so the differences show up directly in the output.
//!
//! Shows how to:
//! - Emit values faster than the consumer can process them
//! - Pick [`CollectPolicy::Buffered`] / `Conflated` / `CollectLatest` per
//!   subscription via [`CollectOptions`]
//! - Read the consequences off the timestamps: what queued, what was
//!   skipped, what was abandoned mid-action
//!
//! ## Flow
//! ```text
//! courses:  +25ms appetizer    +125ms main course    +135ms dessert
//! diner:    150ms per course
//!   ├─► Buffered       every course served, in order
//!   ├─► Conflated      appetizer finishes, main course skipped, dessert served
//!   └─► CollectLatest  appetizer and main course abandoned, only dessert done
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example dinner
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use streamvisor::{
    ColdStream, CollectOptions, Config, ConsumeFn, Orchestrator, Scheduler, StreamCtx,
    StreamError, TokioClock,
};

/// Three courses with uneven gaps between them.
fn courses() -> ColdStream<&'static str> {
    ColdStream::new(|em| async move {
        em.delay(Duration::from_millis(25)).await?;
        em.emit("appetizer").await?;
        em.delay(Duration::from_millis(100)).await?;
        em.emit("main course").await?;
        em.delay(Duration::from_millis(10)).await?;
        em.emit("dessert").await?;
        Ok(())
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("=== dinner example ===\n");

    // 1. Engine: real clock, both lanes mapped onto this runtime.
    let scheduler = Arc::new(Scheduler::current_thread(Arc::new(TokioClock)));
    let orch = Orchestrator::new(Config::default(), scheduler);
    let scope = orch.scope();

    // 2. Same stream, same diner, three policies.
    for options in [
        CollectOptions::buffered(),
        CollectOptions::conflated(),
        CollectOptions::collect_latest(),
    ] {
        println!("--- policy: {} ---", options.policy.as_label());

        let started = Instant::now();
        let diner = ConsumeFn::arc(
            "diner",
            move |course: &'static str, ctx: StreamCtx| async move {
                let t = started.elapsed().as_millis();
                println!("[diner] +{t:>3}ms start {course}");
                // Eating takes longer than the gap between courses.
                ctx.delay(Duration::from_millis(150)).await?;
                let t = started.elapsed().as_millis();
                println!("[diner] +{t:>3}ms done  {course}");
                Ok::<_, StreamError>(())
            },
        );

        let sub = orch.collect(&scope, &courses(), options, diner);
        sub.done().await?;
        println!();
    }

    // 3. Tear the session down.
    match orch.shutdown(scope).await {
        Ok(()) => println!("[orchestrator] stopped gracefully"),
        Err(e) => println!("[orchestrator] stopped with error: {e}"),
    }
    Ok(())
}
