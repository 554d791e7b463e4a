use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::TrackerOptions;

/// Fills unset options from the environment and the built-in probes.
///
/// - `debug` is switched on if `RUNTIME_DIAG_DEBUG` is `1` or `true`.
/// - The timer settings, if left at their defaults, are read from
///   `RUNTIME_DIAG_DUE_TIME_MS` and `RUNTIME_DIAG_INTERVAL_MS`.
/// - A missing process probe becomes [`OsProcessProbe`] (feature `process`).
/// - A missing thread pool probe becomes [`TokioThreadPoolProbe`] over the
///   configured or current runtime (feature `tokio-runtime`).
///
/// No GC heap probe is filled in: Rust allocators keep no generations or
/// collection counts. Registering GC info callbacks therefore needs an
/// explicit [`GcHeapProbe`](crate::samplers::GcHeapProbe) over the managed
/// heap being observed, or [`init`](crate::init) fails with a configuration
/// error.
///
/// [`OsProcessProbe`]: crate::probes::OsProcessProbe
/// [`TokioThreadPoolProbe`]: crate::probes::TokioThreadPoolProbe
pub fn apply_defaults(mut opts: TrackerOptions) -> TrackerOptions {
    if !opts.debug {
        opts.debug = env::var("RUNTIME_DIAG_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
    }
    if opts.timer == Default::default() {
        if let Some(due_time) = env_millis("RUNTIME_DIAG_DUE_TIME_MS") {
            opts.timer.due_time = due_time;
        }
        if let Some(interval) = env_millis("RUNTIME_DIAG_INTERVAL_MS") {
            opts.timer.interval = interval;
        }
    }
    #[cfg(feature = "process")]
    if opts.process_probe.is_none() {
        opts = opts.with_process_probe(crate::probes::OsProcessProbe::new());
    }
    #[cfg(feature = "tokio-runtime")]
    if opts.thread_pool_probe.is_none() {
        let handle = opts
            .runtime
            .clone()
            .or_else(|| tokio::runtime::Handle::try_current().ok());
        if let Some(handle) = handle {
            opts = opts.with_thread_pool_probe(crate::probes::TokioThreadPoolProbe::with_handle(
                handle,
            ));
        }
    }
    opts
}

fn env_millis(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| u64::from_str(v.trim()).ok())
        .map(Duration::from_millis)
}
