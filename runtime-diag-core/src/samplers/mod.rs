//! Periodic samplers and the probes they read.
//!
//! A sampler runs on every tick of the shared timer, reads ambient counters
//! through its probe and produces one snapshot record. Probes are the
//! platform specific part and live outside of this crate; see the
//! `runtime-diag` crate for OS and tokio backed probes.

use std::time::Duration;

use runtime_diag_types::protocol::{GcCompactionMode, GcLatencyMode, GcMode};

use crate::error::{BoxError, SamplingError};

mod gc_info;
mod process_info;
mod thread_info;

pub use self::gc_info::GcInfoSampler;
pub use self::process_info::ProcessInfoSampler;
pub use self::thread_info::ThreadInfoSampler;

/// Produces one snapshot per timer tick.
pub trait Sample: Send + 'static {
    /// The snapshot record.
    type Output: Send + 'static;

    /// Name used in error messages.
    const NAME: &'static str;

    /// Reads the counters and builds a snapshot.
    fn sample(&mut self) -> Result<Self::Output, SamplingError>;
}

/// Optional counters a [`GcHeapProbe`] can provide.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GcHeapCapabilities {
    /// Per generation and large object heap sizes are available.
    pub generation_sizes: bool,
    /// The percentage of time spent in GC is available.
    pub time_in_gc: bool,
}

/// Reads the state of a garbage collected heap.
pub trait GcHeapProbe: Send + Sync + 'static {
    /// The optional counters this probe provides. Queried once, when the
    /// sampler is created.
    fn capabilities(&self) -> GcHeapCapabilities {
        GcHeapCapabilities::default()
    }

    /// Bytes currently thought to be allocated.
    fn total_memory(&self) -> Result<u64, BoxError>;

    /// Number of collections of `generation` (0-2) so far.
    fn collection_count(&self, generation: u32) -> Result<u32, BoxError>;

    /// Size of `generation` in bytes; generation 3 is the large object heap.
    fn generation_size(&self, generation: u32) -> Result<u64, BoxError> {
        let _ = generation;
        Err("generation sizes are not available".into())
    }

    /// Percentage of time spent in GC since the previous collection.
    fn percent_time_in_gc(&self) -> Result<u32, BoxError> {
        Err("time in GC is not available".into())
    }

    /// The collector flavor.
    fn gc_mode(&self) -> GcMode {
        GcMode::Workstation
    }

    /// The current latency mode.
    fn latency_mode(&self) -> GcLatencyMode {
        GcLatencyMode::Interactive
    }

    /// The large object heap compaction mode.
    fn compaction_mode(&self) -> GcCompactionMode {
        GcCompactionMode::Default
    }
}

/// Resource usage of a process at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessSnapshot {
    /// Cumulative CPU time (user and system) consumed so far.
    pub cpu_time: Duration,
    /// Resident set size in bytes.
    pub working_set_bytes: u64,
    /// Memory private to the process in bytes.
    pub private_bytes: u64,
}

/// Reads resource usage of the current process.
pub trait ProcessProbe: Send + Sync + 'static {
    /// Takes a snapshot.
    fn snapshot(&self) -> Result<ProcessSnapshot, BoxError>;

    /// The number of processors CPU time is spread over.
    fn processor_count(&self) -> usize {
        std::thread::available_parallelism().map_or(1, |n| n.get())
    }
}

/// Thread pool saturation at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ThreadPoolSnapshot {
    /// Idle worker threads.
    pub available_worker_threads: u32,
    /// Idle completion port threads.
    pub available_completion_port_threads: u32,
    /// Upper bound of worker threads.
    pub max_worker_threads: u32,
    /// Upper bound of completion port threads.
    pub max_completion_port_threads: u32,
    /// Threads alive in the pool.
    pub thread_count: u32,
    /// Queued work items.
    pub queue_length: u64,
    /// Processed work items.
    pub completed_items_count: u64,
    /// Lock contentions so far.
    pub lock_contention_count: u64,
}

/// Reads the state of a thread pool.
pub trait ThreadPoolProbe: Send + Sync + 'static {
    /// Takes a snapshot.
    fn snapshot(&self) -> Result<ThreadPoolSnapshot, BoxError>;
}
