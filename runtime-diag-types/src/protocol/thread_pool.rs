use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::codes::{ThreadPoolAdjustmentReason, UnknownCodeError};
use crate::utils::hash_f64;

/// A thread pool event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadPoolEventStatistics {
    /// A worker thread started or stopped.
    WorkerStartStop(ThreadPoolWorkerStatistics),
    /// The hill climbing algorithm changed the worker thread count.
    Adjustment(ThreadPoolAdjustmentStatistics),
}

impl Hash for ThreadPoolEventStatistics {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ThreadPoolEventStatistics::WorkerStartStop(stats) => stats.hash(state),
            ThreadPoolEventStatistics::Adjustment(stats) => stats.hash(state),
        }
    }
}

/// Worker thread start/stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadPoolWorkerStatistics {
    /// Timestamp of the event, in provider ticks.
    pub timestamp: i64,
    /// Number of worker threads available to process work, including those
    /// already processing work.
    pub active_worker_threads: u32,
}

/// Thread pool worker count adjustment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreadPoolAdjustmentStatistics {
    /// Timestamp of the event, in provider ticks.
    pub timestamp: i64,
    /// Average throughput of the sampled interval.
    pub average_throughput: f64,
    /// The worker thread count after the adjustment.
    pub new_worker_threads: u32,
    /// The reason code, see [`ThreadPoolAdjustmentReason`].
    ///
    /// Climbing moves are routine; starvation is usually the interesting one.
    pub reason: u32,
}

impl ThreadPoolAdjustmentStatistics {
    /// Describes the reason code of this adjustment.
    pub fn reason_str(&self) -> Result<&'static str, UnknownCodeError> {
        ThreadPoolAdjustmentReason::describe(self.reason)
    }
}

impl Hash for ThreadPoolAdjustmentStatistics {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.timestamp.hash(state);
        hash_f64(self.average_throughput, state);
        self.new_worker_threads.hash(state);
        self.reason.hash(state);
    }
}
