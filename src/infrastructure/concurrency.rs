/// Concurrency management for TraceMatrix.
/// Sizes the rayon pool used when parsing large call logs.

use anyhow::Result;
use tracing::info;

/// Default worker count: half the cores, minimum 1, so aggregation does not
/// starve a test run still executing on the same machine.
pub fn default_workers() -> usize {
    std::cmp::max(1, num_cpus::get() / 2)
}

/// Initialize the global rayon thread pool with `workers` threads
/// (`None` for `default_workers()`).
pub fn init_thread_pool(workers: Option<usize>) -> Result<()> {
    let cores = num_cpus::get();
    let workers = workers.filter(|w| *w > 0).unwrap_or_else(default_workers);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("tracematrix-agg-{}", i))
        .build_global()?;

    info!(
        target: "tracematrix",
        "initialized thread pool: {} workers (system has {} cores)",
        workers,
        cores
    );

    Ok(())
}
