use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::codes::{GcReason, GcSuspendReason, GcType, UnknownCodeError};
use crate::utils::hash_f64;

/// A garbage collection event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GcEventStatistics {
    /// A completed collection, built from a GC start / GC end pair.
    StartEnd(GcStartEndStatistics),
    /// A completed execution engine suspension, built from a suspend begin /
    /// restart end pair.
    Suspend(GcSuspendStatistics),
}

impl Hash for GcEventStatistics {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            GcEventStatistics::StartEnd(stats) => stats.hash(state),
            GcEventStatistics::Suspend(stats) => stats.hash(state),
        }
    }
}

/// One garbage collection cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GcStartEndStatistics {
    /// The collection index, as reported by the runtime.
    pub index: u32,
    /// The collection type code, see [`GcType`].
    pub gc_type: u32,
    /// The collected generation (0-2).
    pub generation: u32,
    /// The reason code, see [`GcReason`].
    pub reason: u32,
    /// Time between GC start and GC end, in milliseconds.
    pub duration_ms: f64,
    /// Timestamp of the GC start event, in provider ticks.
    pub start_time: i64,
    /// Timestamp of the GC end event, in provider ticks.
    pub end_time: i64,
}

impl GcStartEndStatistics {
    /// Describes the reason code of this collection.
    pub fn reason_str(&self) -> Result<&'static str, UnknownCodeError> {
        GcReason::describe(self.reason)
    }

    /// Describes the type code of this collection.
    pub fn gc_type_str(&self) -> Result<&'static str, UnknownCodeError> {
        GcType::describe(self.gc_type)
    }
}

impl Hash for GcStartEndStatistics {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.gc_type.hash(state);
        self.generation.hash(state);
        self.reason.hash(state);
        hash_f64(self.duration_ms, state);
        self.start_time.hash(state);
        self.end_time.hash(state);
    }
}

/// One execution engine suspension.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GcSuspendStatistics {
    /// Time between suspend begin and restart end, in milliseconds.
    pub duration_ms: f64,
    /// The reason code, see [`GcSuspendReason`].
    pub reason: u32,
    /// The suspension count, as reported by the runtime.
    pub count: u32,
}

impl GcSuspendStatistics {
    /// Describes the reason code of this suspension.
    pub fn reason_str(&self) -> Result<&'static str, UnknownCodeError> {
        GcSuspendReason::describe(self.reason)
    }
}

impl Hash for GcSuspendStatistics {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_f64(self.duration_ms, state);
        self.reason.hash(state);
        self.count.hash(state);
    }
}
