use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing_subscriber::EnvFilter;
use varanus::{Engine, LatencySummary, Level, LevelFilter, Options};

/// Calls per measured loop.
const ITERATIONS: u32 = 1_000_000;

/// Large enough to amortize flushes, small enough to exercise the
/// size-triggered path.
const MAX_RECORDS: usize = 4_000;

fn noop() {}

#[tokio::main]
async fn main() -> varanus::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   🦎  VARANUS INSTRUMENTATION OVERHEAD           ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    // ── 1. Engine with an in-process summary sink ────────────────
    let summary = Arc::new(LatencySummary::new());
    let engine = Engine::new();
    engine.configure(
        Options::default()
            .shared_sink(summary.clone())
            .max_buffer_size(MAX_RECORDS)
            .level(LevelFilter::Info),
    )?;

    let monitor = engine.new_monitor("overhead");
    let info = monitor.info(noop);
    let debug = monitor.debug(noop);
    let trace = monitor.trace(noop);

    // ── 2. Measure ───────────────────────────────────────────────
    let raw = time(&engine, noop);
    println!("Baseline call:                  {raw:>6} ns");
    println!(
        "Monitor info overhead/call:     {:>6} ns",
        time(&engine, || info.call(())).saturating_sub(raw)
    );
    println!(
        "Monitor debug overhead/call:    {:>6} ns",
        time(&engine, || debug.call(())).saturating_sub(raw)
    );
    println!(
        "Monitor trace overhead/call:    {:>6} ns",
        time(&engine, || trace.call(())).saturating_sub(raw)
    );
    println!(
        "log_time info time/call:        {:>6} ns",
        time(&engine, || {
            let now = Utc::now();
            monitor.log_time(Level::Info, "fooFn", now, now + chrono::Duration::milliseconds(50));
        })
    );
    println!(
        "log_time debug time/call:       {:>6} ns",
        time(&engine, || {
            let now = Utc::now();
            monitor.log_time(Level::Debug, "fooFn", now, now);
        })
    );

    // ── 3. What the sink saw ─────────────────────────────────────
    engine.stop();
    println!();
    for row in summary.snapshot() {
        println!(
            "  {:<10} {:<8} calls={:<9} p50={}μs p99={}μs",
            row.service, row.fn_name, row.calls, row.p50_us, row.p99_us
        );
    }
    println!();

    Ok(())
}

/// Average wall time per call of `f`, in nanoseconds. Flushes afterwards so
/// each loop starts with an empty buffer.
fn time(engine: &Engine, mut f: impl FnMut()) -> u64 {
    let start = Instant::now();
    for _ in 0..ITERATIONS {
        black_box(f());
    }
    let per_call = start.elapsed().as_nanos() / u128::from(ITERATIONS);
    engine.flush();
    u64::try_from(per_call).unwrap_or(u64::MAX)
}
