//! This crate collects runtime telemetry inside the running process and hands
//! it to your callbacks as typed statistics records.
//!
//! Garbage collection cycles, lock contention and thread pool activity arrive
//! as events from a native provider; GC heap, thread pool and process
//! snapshots are sampled on a shared timer. Every kind is opt-in: register a
//! callback for it and it is collected, leave it out and it costs nothing.
//!
//! # Quickstart
//!
//! [`init`] applies defaults, builds a [`Tracker`], binds it as
//! [`Tracker::current`] and starts it. Tracking stops when the returned guard
//! is dropped.
//!
//! ```
//! use runtime_diag::protocol::ProcessInfoStatistics;
//! use runtime_diag::{Callbacks, TrackerOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), runtime_diag::Error> {
//! let _guard = runtime_diag::init(
//!     TrackerOptions::new()
//!         .with_process_info(Callbacks::new(runtime_diag::emit_fn(|stats: ProcessInfoStatistics| async move {
//!             println!("cpu: {:.1}%", stats.cpu_percent);
//!             Ok(())
//!         }))),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! GC heap snapshots are the exception: no GC heap probe is built in, so
//! GC info callbacks need one set through
//! [`TrackerOptions::with_gc_heap_probe`].
//!
//! # Event providers
//!
//! Event kinds need at least one [`NativeProvider`] wrapping the runtime's
//! tracing facility. This crate does not ship one; implement the trait over
//! whatever delivers the events, or use `runtime_diag_core::test::FakeProvider`
//! to feed events by hand.
//!
//! # Features
//!
//! Default features:
//!
//! * `process`: [`probes::OsProcessProbe`], filled in by [`apply_defaults`].
//! * `tokio-runtime`: [`probes::TokioThreadPoolProbe`], filled in by
//!   [`apply_defaults`].
//! * `log`: the [`sink`] module with `log` backed callbacks.
//!
//! Additional features:
//!
//! * `debug-logs`: internal debug output goes through the `log` crate.
//! * `test`: enables `runtime_diag_core::test`.

#![warn(missing_docs)]
#![cfg_attr(doc_cfg, feature(doc_cfg))]

mod defaults;
mod init;
pub mod probes;
#[cfg(feature = "log")]
#[cfg_attr(doc_cfg, doc(cfg(feature = "log")))]
pub mod sink;

pub use crate::defaults::apply_defaults;
pub use crate::init::{init, TrackerGuard};

pub use runtime_diag_core::*;
