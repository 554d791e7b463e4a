//! One profiler per statistics kind.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use runtime_diag_types::ProviderTarget;
use tokio_util::sync::CancellationToken;

use crate::decoders::{ContentionDecoder, Decode, GcEventDecoder, ThreadPoolDecoder};
use crate::error::{BoxError, Error};
use crate::listener::{report, EventListener, TimerListener};
use crate::options::{Callbacks, TimerOptions};
use crate::provider::NativeProvider;
use crate::samplers::{GcInfoSampler, ProcessInfoSampler, Sample, ThreadInfoSampler};
use crate::timer::SharedTimer;

/// The read loop of a profiler, as returned by [`Profiler::read_result`].
pub type ReadFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

/// The uniform lifecycle of a statistics kind.
///
/// A profiler is enabled only if an emit callback was registered for its
/// kind. A disabled profiler never allocates a listener, and all of its
/// operations are no-ops.
pub trait Profiler: Send + Sync + 'static {
    /// The profiler name, e.g. `GCEventProfiler`.
    fn name(&self) -> &'static str;

    /// Returns `true` while the underlying listener is armed.
    fn enabled(&self) -> bool;

    /// Arms the listener.
    fn start(&self);

    /// Re-arms a stopped listener.
    fn restart(&self);

    /// Disarms the listener.
    fn stop(&self);

    /// Returns the loop forwarding buffered records to the emit callback.
    ///
    /// Errors returned by the emit callback end the loop and are returned
    /// from the future.
    fn read_result(&self, token: CancellationToken) -> ReadFuture;

    /// Hands `err` to the error callback of this kind.
    fn report_error(&self, err: &Error);
}

/// A profiler over an [`EventListener`].
pub struct EventProfiler<D: Decode> {
    name: &'static str,
    listener: Option<EventListener<D>>,
}

/// GC start/end and suspend events.
pub type GcEventProfiler = EventProfiler<GcEventDecoder>;
/// Thread pool worker and adjustment events.
pub type ThreadPoolEventProfiler = EventProfiler<ThreadPoolDecoder>;
/// Lock contention events.
pub type ContentionEventProfiler = EventProfiler<ContentionDecoder>;

impl<D: Decode> EventProfiler<D> {
    /// Creates the profiler. It stays disabled when `callbacks` is `None`.
    pub fn new(
        name: &'static str,
        target: &ProviderTarget,
        providers: &[Arc<dyn NativeProvider>],
        decoder: D,
        callbacks: Option<Callbacks<D::Output>>,
    ) -> Self {
        EventProfiler {
            name,
            listener: callbacks
                .map(|callbacks| EventListener::new(target, providers, decoder, callbacks)),
        }
    }

    /// The listener, if the profiler is enabled.
    pub fn listener(&self) -> Option<&EventListener<D>> {
        self.listener.as_ref()
    }
}

impl<D: Decode> Profiler for EventProfiler<D> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn enabled(&self) -> bool {
        self.listener.as_ref().is_some_and(|l| l.is_enabled())
    }

    fn start(&self) {
        if let Some(listener) = &self.listener {
            let name = self.name;
            listener.run_with_callback(|| diag_debug!("Start: {name}"));
        }
    }

    fn restart(&self) {
        if let Some(listener) = &self.listener {
            listener.restart();
        }
    }

    fn stop(&self) {
        if let Some(listener) = &self.listener {
            listener.stop();
        }
    }

    fn read_result(&self, token: CancellationToken) -> ReadFuture {
        match &self.listener {
            Some(listener) => Box::pin(listener.read_result(token)),
            None => Box::pin(async { Ok(()) }),
        }
    }

    fn report_error(&self, err: &Error) {
        report(self.listener.as_ref().and_then(|l| l.error_callback()), err);
    }
}

impl<D: Decode> fmt::Debug for EventProfiler<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventProfiler")
            .field("name", &self.name)
            .field("listener", &self.listener)
            .finish()
    }
}

/// A profiler over a [`TimerListener`].
pub struct TimerProfiler<S: Sample> {
    name: &'static str,
    listener: Option<TimerListener<S>>,
}

/// Periodic GC heap snapshots.
pub type GcInfoTimerProfiler = TimerProfiler<GcInfoSampler>;
/// Periodic process CPU and memory snapshots.
pub type ProcessInfoTimerProfiler = TimerProfiler<ProcessInfoSampler>;
/// Periodic thread pool snapshots.
pub type ThreadInfoTimerProfiler = TimerProfiler<ThreadInfoSampler>;

impl<S: Sample> TimerProfiler<S> {
    /// Creates the profiler. It stays disabled unless both a sampler and
    /// callbacks are given.
    pub fn new(
        name: &'static str,
        timer: Arc<SharedTimer>,
        options: TimerOptions,
        sampler: Option<S>,
        callbacks: Option<Callbacks<S::Output>>,
    ) -> Self {
        let listener = match (sampler, callbacks) {
            (Some(sampler), Some(callbacks)) => {
                Some(TimerListener::new(timer, options, sampler, callbacks))
            }
            _ => None,
        };
        TimerProfiler { name, listener }
    }

    /// The listener, if the profiler is enabled.
    pub fn listener(&self) -> Option<&TimerListener<S>> {
        self.listener.as_ref()
    }
}

impl<S: Sample> Profiler for TimerProfiler<S> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn enabled(&self) -> bool {
        self.listener.as_ref().is_some_and(|l| l.is_enabled())
    }

    fn start(&self) {
        if let Some(listener) = &self.listener {
            let name = self.name;
            if let Err(err) = listener.run_with_callback(|| diag_debug!("Start: {name}")) {
                self.report_error(&err);
            }
        }
    }

    fn restart(&self) {
        if let Some(listener) = &self.listener {
            listener.restart();
        }
    }

    fn stop(&self) {
        if let Some(listener) = &self.listener {
            listener.stop();
        }
    }

    fn read_result(&self, token: CancellationToken) -> ReadFuture {
        match &self.listener {
            Some(listener) => Box::pin(listener.read_result(token)),
            None => Box::pin(async { Ok(()) }),
        }
    }

    fn report_error(&self, err: &Error) {
        report(self.listener.as_ref().and_then(|l| l.error_callback()), err);
    }
}

impl<S: Sample> fmt::Debug for TimerProfiler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerProfiler")
            .field("name", &self.name)
            .field("listener", &self.listener)
            .finish()
    }
}
