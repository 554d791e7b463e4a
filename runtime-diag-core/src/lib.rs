//! The listener framework and tracker orchestration behind runtime-diag.
//!
//! Native runtime events and periodic samples are turned into typed
//! statistics records by *listeners*. Every listener writes into its own
//! bounded [`EventChannel`], which drops the oldest record when it is full so
//! that the producing thread is never blocked. A read loop per listener drains
//! the channel into a user supplied callback.
//!
//! One [`Profiler`] exists per statistics kind. A profiler without an emit
//! callback is disabled and all of its operations are no-ops. The [`Tracker`]
//! owns the fixed set of profilers and fans lifecycle operations out to them.
//!
//! # Example
//!
//! ```
//! use runtime_diag_core::{emit_fn, Callbacks, Tracker, TrackerOptions};
//! use runtime_diag_core::protocol::GcEventStatistics;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), runtime_diag_core::Error> {
//! let options = TrackerOptions::new()
//!     .with_gc_event(Callbacks::new(emit_fn(|stats: GcEventStatistics| async move {
//!         println!("{stats:?}");
//!         Ok(())
//!     })));
//!
//! let tracker = Tracker::new(options)?;
//! tracker.start()?;
//! assert!(tracker.is_started());
//! tracker.cancel();
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `debug-logs`: internal debug output goes through the `log` crate.
//! - `test`: enables the [`test`] module.

#![warn(missing_docs)]

#[macro_use]
mod macros;

mod channel;
mod error;
mod options;
mod profiler;
mod provider;
mod timer;
mod tracker;

pub mod decoders;
pub mod listener;
pub mod samplers;

pub use runtime_diag_types as types;
pub use runtime_diag_types::protocol;

pub use crate::channel::{EventChannel, CHANNEL_CAPACITY};
pub use crate::error::{BoxError, CallbackError, DecodeError, Error, SamplingError};
#[doc(hidden)]
pub use crate::macros::debug_log as __debug_log;
pub use crate::macros::{debug_enabled, set_debug};
pub use crate::options::{
    emit_fn, error_fn, Callbacks, EmitCallback, EmitFuture, ErrorCallback, TimerOptions,
    TrackerOptions,
};
pub use crate::profiler::{
    ContentionEventProfiler, EventProfiler, GcEventProfiler, GcInfoTimerProfiler,
    ProcessInfoTimerProfiler, Profiler, ReadFuture, ThreadInfoTimerProfiler,
    ThreadPoolEventProfiler, TimerProfiler,
};
pub use crate::provider::{EventSink, NativeProvider, SubscriptionId};
pub use crate::timer::{SharedTimer, TickId};
pub use crate::tracker::{Tracker, TrackerState};
pub use tokio_util::sync::CancellationToken;
