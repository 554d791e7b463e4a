//! Thread pool probe over a tokio runtime.

use runtime_diag_core::samplers::{ThreadPoolProbe, ThreadPoolSnapshot};
use runtime_diag_core::BoxError;
use tokio::runtime::Handle;

/// Reads thread pool saturation from a tokio runtime.
///
/// Worker threads map to the runtime's workers and the queue length to its
/// global queue. Busy workers are estimated from the number of alive tasks,
/// capped at the worker count. The thread count covers the whole process
/// (Linux only).
///
/// With `--cfg tokio_unstable` the blocking pool is reported as completion
/// port threads and the completed items count sums the workers' poll counts.
#[derive(Debug)]
pub struct TokioThreadPoolProbe {
    handle: Handle,
}

impl TokioThreadPoolProbe {
    /// Try to create a probe over the current runtime.
    ///
    /// Returns `None` if no tokio runtime is available.
    pub fn try_new() -> Option<Self> {
        Handle::try_current().ok().map(|handle| Self { handle })
    }

    /// Creates a probe over the given runtime.
    pub fn with_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl ThreadPoolProbe for TokioThreadPoolProbe {
    fn snapshot(&self) -> Result<ThreadPoolSnapshot, BoxError> {
        let metrics = self.handle.metrics();
        let workers = u32::try_from(metrics.num_workers()).unwrap_or(u32::MAX);
        let alive = u32::try_from(metrics.num_alive_tasks()).unwrap_or(u32::MAX);

        #[allow(unused_mut)]
        let mut snapshot = ThreadPoolSnapshot {
            available_worker_threads: workers - alive.min(workers),
            max_worker_threads: workers,
            thread_count: super::thread_count().unwrap_or(workers),
            queue_length: metrics.global_queue_depth() as u64,
            ..Default::default()
        };

        #[cfg(tokio_unstable)]
        {
            let blocking = u32::try_from(metrics.num_blocking_threads()).unwrap_or(u32::MAX);
            let idle = u32::try_from(metrics.num_idle_blocking_threads()).unwrap_or(u32::MAX);
            snapshot.available_completion_port_threads = idle;
            snapshot.max_completion_port_threads = blocking;
            snapshot.completed_items_count = (0..metrics.num_workers())
                .map(|i| metrics.worker_poll_count(i))
                .sum();
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tokio_probe() {
        let probe = TokioThreadPoolProbe::try_new().expect("should have runtime");
        let snapshot = probe.snapshot().unwrap();
        assert_eq!(snapshot.max_worker_threads, 2);
        assert!(snapshot.available_worker_threads <= 2);
        assert!(snapshot.thread_count >= 2);
    }

    #[test]
    fn test_no_runtime() {
        assert!(TokioThreadPoolProbe::try_new().is_none());
    }
}
