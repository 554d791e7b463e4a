use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::codes::{GcCompactionMode, GcLatencyMode, GcMode};

/// Periodic snapshot of the garbage collected heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GcInfoStatistics {
    /// When the snapshot was taken.
    pub timestamp: SystemTime,
    /// Bytes currently thought to be allocated on the heap.
    pub heap_size: u64,
    /// Number of generation 0 collections so far.
    pub gen0_count: u32,
    /// Number of generation 1 collections so far.
    pub gen1_count: u32,
    /// Number of generation 2 collections so far.
    pub gen2_count: u32,
    /// Size of generation 0 in bytes.
    pub gen0_size: u64,
    /// Size of generation 1 in bytes.
    pub gen1_size: u64,
    /// Size of generation 2 in bytes.
    pub gen2_size: u64,
    /// Size of the large object heap in bytes.
    pub loh_size: u64,
    /// Percentage of time spent in GC since the previous collection.
    pub time_in_gc_percent: u32,
    /// Workstation or server GC.
    pub gc_mode: GcMode,
    /// The current latency mode.
    pub latency_mode: GcLatencyMode,
    /// The large object heap compaction mode.
    pub compaction_mode: GcCompactionMode,
}
