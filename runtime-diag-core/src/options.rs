use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use runtime_diag_types::protocol::{
    ContentionEventStatistics, GcEventStatistics, GcInfoStatistics, ProcessInfoStatistics,
    ThreadInfoStatistics, ThreadPoolEventStatistics,
};
use tokio::runtime::Handle;

use crate::error::{BoxError, Error};
use crate::provider::NativeProvider;
use crate::samplers::{GcHeapProbe, ProcessProbe, ThreadPoolProbe};
use crate::timer::SharedTimer;

/// The future returned by an [`EmitCallback`].
pub type EmitFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

/// Receives every statistics record of one kind, in channel order.
pub type EmitCallback<T> = Arc<dyn Fn(T) -> EmitFuture + Send + Sync>;

/// Receives decode, sampling and callback errors.
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// Wraps an async closure into an [`EmitCallback`].
pub fn emit_fn<T, F, Fut>(f: F) -> EmitCallback<T>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(move |record| Box::pin(f(record)))
}

/// Wraps a closure into an [`ErrorCallback`].
pub fn error_fn<F>(f: F) -> ErrorCallback
where
    F: Fn(&Error) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The callback pair registered for one statistics kind.
pub struct Callbacks<T> {
    /// Called for every record.
    pub emit: EmitCallback<T>,
    /// Called for every error of this kind.
    pub error: Option<ErrorCallback>,
}

impl<T> Callbacks<T> {
    /// Creates a pair without error callback.
    pub fn new(emit: EmitCallback<T>) -> Self {
        Callbacks { emit, error: None }
    }

    /// Sets the error callback.
    #[must_use]
    pub fn with_error(mut self, error: ErrorCallback) -> Self {
        self.error = Some(error);
        self
    }
}

impl<T> Clone for Callbacks<T> {
    fn clone(&self) -> Self {
        Callbacks {
            emit: self.emit.clone(),
            error: self.error.clone(),
        }
    }
}

impl<T> fmt::Debug for Callbacks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("error", &self.error.is_some())
            .finish_non_exhaustive()
    }
}

/// Scheduling of the shared timer driving the timer listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerOptions {
    /// Delay before the first tick.
    ///
    /// Default: 0 seconds
    pub due_time: Duration,
    /// Delay between ticks.
    ///
    /// Default: 1 second
    pub interval: Duration,
}

impl Default for TimerOptions {
    fn default() -> Self {
        TimerOptions {
            due_time: Duration::ZERO,
            interval: Duration::from_secs(1),
        }
    }
}

/// Configuration of a [`Tracker`](crate::Tracker).
///
/// Every statistics kind is opt-in: its profiler is only enabled when a
/// callback pair was registered for it. Timer kinds additionally need the
/// probe they sample.
#[derive(Clone, Default)]
pub struct TrackerOptions {
    /// Callbacks for GC start/end and suspend events.
    pub gc_event: Option<Callbacks<GcEventStatistics>>,
    /// Callbacks for lock contention events.
    pub contention_event: Option<Callbacks<ContentionEventStatistics>>,
    /// Callbacks for thread pool events.
    pub thread_pool_event: Option<Callbacks<ThreadPoolEventStatistics>>,
    /// Callbacks for periodic GC heap snapshots.
    pub gc_info: Option<Callbacks<GcInfoStatistics>>,
    /// Callbacks for periodic process snapshots.
    pub process_info: Option<Callbacks<ProcessInfoStatistics>>,
    /// Callbacks for periodic thread pool snapshots.
    pub thread_info: Option<Callbacks<ThreadInfoStatistics>>,
    /// Scheduling of the timer kinds.
    pub timer: TimerOptions,
    /// The native providers event listeners subscribe to.
    pub providers: Vec<Arc<dyn NativeProvider>>,
    /// Probe sampled by the GC info profiler.
    pub gc_heap_probe: Option<Arc<dyn GcHeapProbe>>,
    /// Probe sampled by the process info profiler.
    pub process_probe: Option<Arc<dyn ProcessProbe>>,
    /// Probe sampled by the thread info profiler.
    pub thread_pool_probe: Option<Arc<dyn ThreadPoolProbe>>,
    /// Runtime the read loops are spawned on.
    ///
    /// Defaults to the runtime `start` is called from.
    pub runtime: Option<Handle>,
    /// Timer driving the timer kinds.
    ///
    /// Defaults to [`SharedTimer::global`].
    pub shared_timer: Option<Arc<SharedTimer>>,
    /// Enables internal debug output.
    pub debug: bool,
}

impl TrackerOptions {
    /// Creates options without any registered callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the GC event callbacks.
    #[must_use]
    pub fn with_gc_event(mut self, callbacks: Callbacks<GcEventStatistics>) -> Self {
        self.gc_event = Some(callbacks);
        self
    }

    /// Registers the contention event callbacks.
    #[must_use]
    pub fn with_contention_event(mut self, callbacks: Callbacks<ContentionEventStatistics>) -> Self {
        self.contention_event = Some(callbacks);
        self
    }

    /// Registers the thread pool event callbacks.
    #[must_use]
    pub fn with_thread_pool_event(
        mut self,
        callbacks: Callbacks<ThreadPoolEventStatistics>,
    ) -> Self {
        self.thread_pool_event = Some(callbacks);
        self
    }

    /// Registers the GC info callbacks.
    #[must_use]
    pub fn with_gc_info(mut self, callbacks: Callbacks<GcInfoStatistics>) -> Self {
        self.gc_info = Some(callbacks);
        self
    }

    /// Registers the process info callbacks.
    #[must_use]
    pub fn with_process_info(mut self, callbacks: Callbacks<ProcessInfoStatistics>) -> Self {
        self.process_info = Some(callbacks);
        self
    }

    /// Registers the thread info callbacks.
    #[must_use]
    pub fn with_thread_info(mut self, callbacks: Callbacks<ThreadInfoStatistics>) -> Self {
        self.thread_info = Some(callbacks);
        self
    }

    /// Sets the timer scheduling.
    #[must_use]
    pub fn with_timer(mut self, due_time: Duration, interval: Duration) -> Self {
        self.timer = TimerOptions { due_time, interval };
        self
    }

    /// Adds a native provider.
    #[must_use]
    pub fn with_provider<P: NativeProvider>(mut self, provider: Arc<P>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Sets the GC heap probe.
    #[must_use]
    pub fn with_gc_heap_probe<P: GcHeapProbe>(mut self, probe: P) -> Self {
        self.gc_heap_probe = Some(Arc::new(probe));
        self
    }

    /// Sets the process probe.
    #[must_use]
    pub fn with_process_probe<P: ProcessProbe>(mut self, probe: P) -> Self {
        self.process_probe = Some(Arc::new(probe));
        self
    }

    /// Sets the thread pool probe.
    #[must_use]
    pub fn with_thread_pool_probe<P: ThreadPoolProbe>(mut self, probe: P) -> Self {
        self.thread_pool_probe = Some(Arc::new(probe));
        self
    }

    /// Sets the runtime read loops are spawned on.
    #[must_use]
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Sets the timer driving the timer kinds.
    #[must_use]
    pub fn with_shared_timer(mut self, timer: Arc<SharedTimer>) -> Self {
        self.shared_timer = Some(timer);
        self
    }

    /// Enables or disables internal debug output.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The number of kinds with a registered callback pair.
    pub fn registered_count(&self) -> usize {
        [
            self.gc_event.is_some(),
            self.contention_event.is_some(),
            self.thread_pool_event.is_some(),
            self.gc_info.is_some(),
            self.process_info.is_some(),
            self.thread_info.is_some(),
        ]
        .into_iter()
        .filter(|registered| *registered)
        .count()
    }

    /// Checks the options for configuration errors.
    pub fn validate(&self) -> Result<(), Error> {
        if self.registered_count() == 0 {
            return Err(Error::config("no statistics callback registered"));
        }
        let has_timer_kind =
            self.gc_info.is_some() || self.process_info.is_some() || self.thread_info.is_some();
        if has_timer_kind && self.timer.interval.is_zero() {
            return Err(Error::config("timer interval must not be zero"));
        }
        if self.gc_info.is_some() && self.gc_heap_probe.is_none() {
            return Err(Error::config("gc info callbacks need a GC heap probe"));
        }
        if self.process_info.is_some() && self.process_probe.is_none() {
            return Err(Error::config("process info callbacks need a process probe"));
        }
        if self.thread_info.is_some() && self.thread_pool_probe.is_none() {
            return Err(Error::config("thread info callbacks need a thread pool probe"));
        }
        Ok(())
    }
}

impl fmt::Debug for TrackerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let providers: Vec<_> = self.providers.iter().map(|p| p.name().to_owned()).collect();
        f.debug_struct("TrackerOptions")
            .field("gc_event", &self.gc_event.is_some())
            .field("contention_event", &self.contention_event.is_some())
            .field("thread_pool_event", &self.thread_pool_event.is_some())
            .field("gc_info", &self.gc_info.is_some())
            .field("process_info", &self.process_info.is_some())
            .field("thread_info", &self.thread_info.is_some())
            .field("timer", &self.timer)
            .field("providers", &providers)
            .field("gc_heap_probe", &self.gc_heap_probe.is_some())
            .field("process_probe", &self.process_probe.is_some())
            .field("thread_pool_probe", &self.thread_pool_probe.is_some())
            .field("runtime", &self.runtime.is_some())
            .field("shared_timer", &self.shared_timer)
            .field("debug", &self.debug)
            .finish()
    }
}
