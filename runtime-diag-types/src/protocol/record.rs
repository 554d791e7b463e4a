use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    ContentionEventStatistics, GcEventStatistics, GcInfoStatistics, ProcessInfoStatistics,
    ThreadInfoStatistics, ThreadPoolEventStatistics,
};

/// The category a statistics record belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsKind {
    /// GC start/end and suspend events.
    GcEvent,
    /// Lock contention events.
    ContentionEvent,
    /// Thread pool worker and adjustment events.
    ThreadPoolEvent,
    /// Periodic GC heap snapshots.
    GcInfo,
    /// Periodic process snapshots.
    ProcessInfo,
    /// Periodic thread pool snapshots.
    ThreadInfo,
}

impl StatisticsKind {
    /// Returns the kind as a static string.
    pub fn as_str(self) -> &'static str {
        match self {
            StatisticsKind::GcEvent => "gc_event",
            StatisticsKind::ContentionEvent => "contention_event",
            StatisticsKind::ThreadPoolEvent => "thread_pool_event",
            StatisticsKind::GcInfo => "gc_info",
            StatisticsKind::ProcessInfo => "process_info",
            StatisticsKind::ThreadInfo => "thread_info",
        }
    }
}

impl fmt::Display for StatisticsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any statistics record.
///
/// Listeners produce the concrete record types; this wrapper exists for sinks
/// that handle every kind through one code path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StatisticsRecord {
    /// See [`GcEventStatistics`].
    GcEvent(GcEventStatistics),
    /// See [`ContentionEventStatistics`].
    ContentionEvent(ContentionEventStatistics),
    /// See [`ThreadPoolEventStatistics`].
    ThreadPoolEvent(ThreadPoolEventStatistics),
    /// See [`GcInfoStatistics`].
    GcInfo(GcInfoStatistics),
    /// See [`ProcessInfoStatistics`].
    ProcessInfo(ProcessInfoStatistics),
    /// See [`ThreadInfoStatistics`].
    ThreadInfo(ThreadInfoStatistics),
}

impl StatisticsRecord {
    /// The category of this record.
    pub fn kind(&self) -> StatisticsKind {
        match self {
            StatisticsRecord::GcEvent(_) => StatisticsKind::GcEvent,
            StatisticsRecord::ContentionEvent(_) => StatisticsKind::ContentionEvent,
            StatisticsRecord::ThreadPoolEvent(_) => StatisticsKind::ThreadPoolEvent,
            StatisticsRecord::GcInfo(_) => StatisticsKind::GcInfo,
            StatisticsRecord::ProcessInfo(_) => StatisticsKind::ProcessInfo,
            StatisticsRecord::ThreadInfo(_) => StatisticsKind::ThreadInfo,
        }
    }
}

macro_rules! impl_from {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for StatisticsRecord {
            #[inline]
            fn from(stats: $ty) -> Self {
                StatisticsRecord::$variant(stats)
            }
        }
    };
}

impl_from!(GcEventStatistics, GcEvent);
impl_from!(ContentionEventStatistics, ContentionEvent);
impl_from!(ThreadPoolEventStatistics, ThreadPoolEvent);
impl_from!(GcInfoStatistics, GcInfo);
impl_from!(ProcessInfoStatistics, ProcessInfo);
impl_from!(ThreadInfoStatistics, ThreadInfo);

impl fmt::Display for StatisticsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatisticsRecord::GcEvent(GcEventStatistics::StartEnd(gc)) => write!(
                f,
                "GC StartEnd Reason {}; Duration {}ms; Index {}; Gen {}; Type {};",
                gc.reason, gc.duration_ms, gc.index, gc.generation, gc.gc_type
            ),
            StatisticsRecord::GcEvent(GcEventStatistics::Suspend(suspend)) => write!(
                f,
                "GC Suspend Reason {}; Duration {}ms; Count {};",
                suspend.reason, suspend.duration_ms, suspend.count
            ),
            StatisticsRecord::ContentionEvent(contention) => write!(
                f,
                "Contention Flag {}; DurationNs {};",
                contention.flag, contention.duration_ns
            ),
            StatisticsRecord::ThreadPoolEvent(ThreadPoolEventStatistics::WorkerStartStop(
                worker,
            )) => write!(
                f,
                "ThreadPool ActiveWorkerThreads {};",
                worker.active_worker_threads
            ),
            StatisticsRecord::ThreadPoolEvent(ThreadPoolEventStatistics::Adjustment(adj)) => {
                write!(
                    f,
                    "ThreadPoolAdjustment Reason {}; NewWorkerThreads {}; AverageThroughput {};",
                    adj.reason, adj.new_worker_threads, adj.average_throughput
                )
            }
            StatisticsRecord::GcInfo(info) => write!(
                f,
                "GCInfo HeapSize {}; Gen0Count {}; Gen1Count {}; Gen2Count {}; Gen0Size {}; \
                 Gen1Size {}; Gen2Size {}; LohSize {}; TimeInGc {};",
                info.heap_size,
                info.gen0_count,
                info.gen1_count,
                info.gen2_count,
                info.gen0_size,
                info.gen1_size,
                info.gen2_size,
                info.loh_size,
                info.time_in_gc_percent
            ),
            StatisticsRecord::ProcessInfo(info) => write!(
                f,
                "ProcessInfo Cpu {}; PrivateBytes {}; WorkingSet {};",
                info.cpu_percent, info.private_bytes, info.working_set_bytes
            ),
            StatisticsRecord::ThreadInfo(info) => write!(
                f,
                "ThreadInfo AvailableWorkerThreads {}; MaxWorkerThreads {}; UsingWorkerThreads {}; \
                 ThreadCount {}; QueueLength {}; LockContentionCount {}; CompletedItemsCount {}; \
                 AvailableCompletionPortThreads {};",
                info.available_worker_threads,
                info.max_worker_threads,
                info.busy_worker_threads(),
                info.thread_count,
                info.queue_length,
                info.lock_contention_count,
                info.completed_items_count,
                info.available_completion_port_threads
            ),
        }
    }
}
