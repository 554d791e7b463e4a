use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Periodic snapshot of thread pool saturation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadInfoStatistics {
    /// When the snapshot was taken.
    pub timestamp: SystemTime,
    /// Worker threads that are idle and can pick up work.
    pub available_worker_threads: u32,
    /// Completion port (I/O) threads that are idle.
    pub available_completion_port_threads: u32,
    /// Upper bound of worker threads.
    pub max_worker_threads: u32,
    /// Upper bound of completion port threads.
    pub max_completion_port_threads: u32,
    /// Number of threads currently alive in the pool.
    pub thread_count: u32,
    /// Work items queued but not yet started.
    pub queue_length: u64,
    /// Work items processed so far.
    pub completed_items_count: u64,
    /// Lock contentions observed so far.
    pub lock_contention_count: u64,
}

impl ThreadInfoStatistics {
    /// Worker threads currently busy.
    pub fn busy_worker_threads(&self) -> u32 {
        self.max_worker_threads
            .saturating_sub(self.available_worker_threads)
    }
}
