use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a numeric code has no documented meaning.
///
/// Reason lookups are deliberately strict: a code outside the documented
/// range is reported instead of being mapped to a placeholder string.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
#[error("{kind} code {code} is not defined")]
pub struct UnknownCodeError {
    /// The kind of code that was looked up (e.g. `"gc reason"`).
    pub kind: &'static str,
    /// The offending numeric value.
    pub code: u32,
}

macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $kind:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $code:literal => $text:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Returns the numeric code of this value.
            pub fn code(self) -> u32 {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            /// Returns the human readable description of this value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            /// Looks up the description of a raw numeric code.
            pub fn describe(code: u32) -> Result<&'static str, UnknownCodeError> {
                Self::try_from(code).map(Self::as_str)
            }
        }

        impl TryFrom<u32> for $name {
            type Error = UnknownCodeError;

            fn try_from(code: u32) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    _ => Err(UnknownCodeError { kind: $kind, code }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

code_enum! {
    /// Why a garbage collection was triggered.
    pub enum GcReason: "gc reason" {
        /// Small object heap allocation.
        SmallObjectHeapAllocation = 0 => "small object heap allocation",
        /// Induced.
        Induced = 1 => "induced",
        /// Low memory.
        LowMemory = 2 => "low memory",
        /// Empty.
        Empty = 3 => "empty",
        /// Large object heap allocation.
        LargeObjectHeapAllocation = 4 => "large object heap allocation",
        /// Out of space for the small object heap.
        OutOfSpaceSmallObjectHeap = 5 => "out of space (small object heap)",
        /// Out of space for the large object heap.
        OutOfSpaceLargeObjectHeap = 6 => "out of space (large object heap)",
        /// Induced but not forced as blocking.
        InducedNotForcedBlocking = 7 => "induced but not forced as blocking",
    }
}

code_enum! {
    /// The kind of a garbage collection.
    pub enum GcType: "gc type" {
        /// Blocking collection outside of a background collection.
        NonConcurrent = 0 => "blocking outside background gc",
        /// Background collection.
        Background = 1 => "background gc",
        /// Blocking collection during a background collection.
        BlockingDuringBackground = 2 => "blocking during background gc",
    }
}

code_enum! {
    /// Why the execution engine was suspended.
    pub enum GcSuspendReason: "gc suspend reason" {
        /// Other.
        Other = 0 => "other",
        /// Garbage collection.
        GarbageCollection = 1 => "garbage collection",
        /// Application domain shutdown.
        AppDomainShutdown = 2 => "appdomain shutdown",
        /// Code pitching.
        CodePitching = 3 => "code pitching",
        /// Shutdown.
        Shutdown = 4 => "shutdown",
        /// Debugger.
        Debugger = 5 => "debugger",
        /// Preparation for garbage collection.
        PrepareGarbageCollection = 6 => "preparation for garbage collection",
    }
}

code_enum! {
    /// Why the thread pool changed its worker thread count.
    pub enum ThreadPoolAdjustmentReason: "thread pool adjustment reason" {
        /// Warmup.
        Warmup = 0 => "warmup",
        /// Initializing.
        Initializing = 1 => "initializing",
        /// Random move.
        RandomMove = 2 => "random move",
        /// Hill climbing move.
        ClimbingMove = 3 => "climbing move",
        /// Change point.
        ChangePoint = 4 => "change point",
        /// Stabilizing.
        Stabilizing = 5 => "stabilizing",
        /// Starvation.
        Starvation = 6 => "starvation",
        /// A worker thread timed out.
        ThreadTimedOut = 7 => "thread timed out",
    }
}

code_enum! {
    /// Whether a contended lock is a managed or a native lock.
    pub enum ContentionFlag: "contention flag" {
        /// A managed monitor lock.
        Managed = 0 => "managed",
        /// A lock used by the runtime itself.
        Native = 1 => "native",
    }
}

code_enum! {
    /// The garbage collector flavor.
    pub enum GcMode: "gc mode" {
        /// Workstation GC.
        Workstation = 0 => "workstation",
        /// Server GC.
        Server = 1 => "server",
    }
}

code_enum! {
    /// The latency mode the garbage collector runs in.
    pub enum GcLatencyMode: "gc latency mode" {
        /// Batch.
        Batch = 0 => "batch",
        /// Interactive.
        Interactive = 1 => "interactive",
        /// Low latency.
        LowLatency = 2 => "low latency",
        /// Sustained low latency.
        SustainedLowLatency = 3 => "sustained low latency",
        /// No GC region.
        NoGcRegion = 4 => "no gc region",
    }
}

code_enum! {
    /// Large object heap compaction mode.
    pub enum GcCompactionMode: "gc compaction mode" {
        /// The large object heap is not compacted.
        Default = 1 => "default",
        /// The large object heap is compacted during the next blocking collection.
        CompactOnce = 2 => "compact once",
    }
}
