//! Probes backed by the operating system and the tokio runtime.
//!
//! These plug into the timer profilers of `runtime-diag-core`; see
//! [`apply_defaults`](crate::apply_defaults) for how they are filled in.

#[cfg(feature = "process")]
mod process;
#[cfg(feature = "tokio-runtime")]
mod tokio_runtime;

#[cfg(feature = "process")]
pub use self::process::OsProcessProbe;
#[cfg(feature = "tokio-runtime")]
pub use self::tokio_runtime::TokioThreadPoolProbe;

/// Gets the number of threads in the current process.
#[cfg(target_os = "linux")]
#[allow(dead_code)]
pub(crate) fn thread_count() -> Option<u32> {
    // one entry per thread in /proc/self/task/
    let entries = std::fs::read_dir("/proc/self/task").ok()?;
    u32::try_from(entries.count()).ok()
}

/// Fallback for platforms without a cheap thread listing.
#[cfg(not(target_os = "linux"))]
#[allow(dead_code)]
pub(crate) fn thread_count() -> Option<u32> {
    None
}
