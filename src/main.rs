/*!
 * GThreads Demo
 *
 * Four green threads on one OS thread:
 * - two "F" workers that suspend themselves until a "G" worker resumes them
 * - two "G" workers that count down, then wake their F partner
 *
 * Environment variables:
 * - GTHREADS_DEMO_COUNT: iterations per worker (default: 10)
 * - GTHREADS_*: runtime configuration, see `RuntimeConfig::from_env`
 * - RUST_LOG / GTHREADS_TRACE_JSON: logging, see `logging::init_tracing`
 *
 * Pass `--json` to print the final table as JSON instead of text.
 */

use anyhow::Context;
use gthreads::core::sleep_uninterruptible;
use gthreads::logging::init_tracing;
use gthreads::{Runtime, RuntimeConfig};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::info;

const DEFAULT_COUNT: u32 = 10;

/// Work simulated per iteration
const WORK: Duration = Duration::from_millis(1);

static COUNT: AtomicU32 = AtomicU32::new(DEFAULT_COUNT);

/// Print one progress line without being preempted mid-write
fn report(kind: &str, remaining: u32) {
    gthreads::with_preemption_disabled(|| {
        let id = gthreads::current_id().unwrap_or_default();
        let name = gthreads::current_name().unwrap_or_default();
        let arg = gthreads::current_argument().unwrap_or_default();
        println!("{kind} thread id: {id}, count: {remaining}, name: {name}, arg: {arg}");
    });
}

fn work(kind: &str) {
    for remaining in (0..COUNT.load(Ordering::Relaxed)).rev() {
        report(kind, remaining);
        let _ = sleep_uninterruptible(WORK);
        if !cfg!(feature = "preemptive") {
            gthreads::yield_now();
        }
    }
}

fn worker_f() {
    if let Ok(me) = gthreads::current_id() {
        let _ = gthreads::suspend(me);
    }
    work("F");
}

fn worker_g() {
    work("G");
    // The spawn order pairs G in slot n with F in slot n - 2.
    if let Some(partner) = gthreads::current_id().ok().and_then(|me| me.checked_sub(2)) {
        let _ = gthreads::resume(partner);
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    if let Some(count) = std::env::var("GTHREADS_DEMO_COUNT")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        COUNT.store(count, Ordering::Relaxed);
    }
    let json = std::env::args().any(|arg| arg == "--json");

    let config = RuntimeConfig::default()
        .from_env()
        .context("invalid GTHREADS_* configuration")?;
    let runtime = Runtime::init(config).context("failed to initialize the runtime")?;

    runtime.spawn(worker_f, "First thread", 1, 1)?;
    runtime.spawn(worker_f, "Second thread", 3, 1)?;
    runtime.spawn(worker_g, "Third thread", 6, 1)?;
    runtime.spawn(worker_g, "Fourth thread", 9, 1)?;

    {
        let _cs = runtime.no_preempt();
        println!("{}", runtime.list());
    }

    runtime
        .run_until_quiescent()
        .context("driver loop stopped early")?;

    let _cs = runtime.no_preempt();
    if json {
        println!("{}", serde_json::to_string_pretty(&runtime.snapshot())?);
    } else {
        println!("{}", runtime.list());
    }
    info!(stats = ?runtime.stats(), "threads finished");
    Ok(())
}
