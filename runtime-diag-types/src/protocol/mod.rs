//! The statistics records produced by runtime-diag.
//!
//! Every record is a flat, immutable value. Records never reference each
//! other or any external state, and numeric reason codes can be resolved with
//! the lookup methods on each record.

mod contention;
mod gc;
mod gc_info;
mod process_info;
mod record;
mod thread_info;
mod thread_pool;

pub use crate::codes::{
    ContentionFlag, GcCompactionMode, GcLatencyMode, GcMode, GcReason, GcSuspendReason, GcType,
    ThreadPoolAdjustmentReason,
};

pub use self::contention::ContentionEventStatistics;
pub use self::gc::{GcEventStatistics, GcStartEndStatistics, GcSuspendStatistics};
pub use self::gc_info::GcInfoStatistics;
pub use self::process_info::ProcessInfoStatistics;
pub use self::record::{StatisticsKind, StatisticsRecord};
pub use self::thread_info::ThreadInfoStatistics;
pub use self::thread_pool::{
    ThreadPoolAdjustmentStatistics, ThreadPoolEventStatistics, ThreadPoolWorkerStatistics,
};
