//! This crate provides common types for working with runtime diagnostics.
//!
//! It contains the statistics records produced by the runtime-diag listeners
//! (GC cycles, lock contention, thread-pool activity and periodic GC, thread
//! and process snapshots), the raw event model handed over by native event
//! providers, and the legacy `GC:` line format.
//!
//! Users will rarely need this crate directly; it is re-exported by
//! `runtime-diag-core` and the `runtime-diag` umbrella crate.

#![warn(missing_docs)]

mod codes;
mod event;
mod gc_stats;
mod utils;

pub mod protocol;

pub use crate::codes::UnknownCodeError;
pub use crate::event::{
    EventKeywords, EventLevel, PayloadError, PayloadValue, ProviderTarget, RawEvent,
    RUNTIME_PROVIDER_NAME, TICKS_PER_MILLISECOND,
};
pub use crate::gc_stats::{GcStats, GcStatsParseError};
