use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use runtime_diag_types::protocol::ThreadInfoStatistics;

use super::{Sample, ThreadPoolProbe};
use crate::error::SamplingError;

/// Samples [`ThreadInfoStatistics`] from a [`ThreadPoolProbe`].
pub struct ThreadInfoSampler {
    probe: Arc<dyn ThreadPoolProbe>,
}

impl ThreadInfoSampler {
    /// Creates a sampler over `probe`.
    pub fn new(probe: Arc<dyn ThreadPoolProbe>) -> Self {
        ThreadInfoSampler { probe }
    }
}

impl Sample for ThreadInfoSampler {
    type Output = ThreadInfoStatistics;
    const NAME: &'static str = "thread info";

    fn sample(&mut self) -> Result<ThreadInfoStatistics, SamplingError> {
        let timestamp = SystemTime::now();
        let snapshot = self
            .probe
            .snapshot()
            .map_err(|err| SamplingError::probe("thread pool", err))?;

        Ok(ThreadInfoStatistics {
            timestamp,
            available_worker_threads: snapshot.available_worker_threads,
            available_completion_port_threads: snapshot.available_completion_port_threads,
            max_worker_threads: snapshot.max_worker_threads,
            max_completion_port_threads: snapshot.max_completion_port_threads,
            thread_count: snapshot.thread_count,
            queue_length: snapshot.queue_length,
            completed_items_count: snapshot.completed_items_count,
            lock_contention_count: snapshot.lock_contention_count,
        })
    }
}

impl fmt::Debug for ThreadInfoSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadInfoSampler").finish_non_exhaustive()
    }
}
