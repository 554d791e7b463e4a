use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use runtime_diag_types::ProviderTarget;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::decoders::{ContentionDecoder, GcEventDecoder, ThreadPoolDecoder};
use crate::error::{panic_message, BoxError, CallbackError, Error};
use crate::macros::set_debug;
use crate::options::TrackerOptions;
use crate::profiler::{
    ContentionEventProfiler, GcEventProfiler, GcInfoTimerProfiler, ProcessInfoTimerProfiler,
    Profiler, ThreadInfoTimerProfiler, ThreadPoolEventProfiler,
};
use crate::samplers::{GcInfoSampler, ProcessInfoSampler, ThreadInfoSampler};
use crate::timer::SharedTimer;

static CURRENT: RwLock<Option<Arc<Tracker>>> = RwLock::new(None);

/// The lifecycle state of a [`Tracker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackerState {
    /// Never started, or reset after a cancellation.
    Uninitialized,
    /// Started and not stopped.
    Started,
    /// Started, then stopped. Can be restarted.
    Stopped,
    /// The token was cancelled; a [`reset`](Tracker::reset) is needed
    /// before starting again.
    Cancelled,
}

/// Owns the fixed set of profilers and fans lifecycle operations out to them.
///
/// Only the first [`start`](Self::start) after construction or a
/// [`reset`](Self::reset) does anything. It arms every profiler and spawns
/// one read loop per enabled profiler on the tokio runtime, all sharing the
/// current cancellation token. Each read loop is supervised: if it ends with
/// an error or a panic, that is reported to the error callback of its
/// profiler.
pub struct Tracker {
    profilers: Vec<Arc<dyn Profiler>>,
    /// 0 while idle, otherwise the generation of the active start.
    active: Arc<AtomicU64>,
    generation: AtomicU64,
    stopped: AtomicBool,
    token: RwLock<CancellationToken>,
    runtime: Option<Handle>,
}

impl Tracker {
    /// Builds the profilers for `options`.
    ///
    /// Fails if the options register no callback or miss a timer setting or
    /// probe a registered kind needs.
    pub fn new(options: TrackerOptions) -> Result<Tracker, Error> {
        options.validate()?;
        if options.debug {
            set_debug(true);
        }

        let target = ProviderTarget::runtime();
        let providers = &options.providers;
        let timer = options
            .shared_timer
            .clone()
            .unwrap_or_else(SharedTimer::global);

        let profilers: Vec<Arc<dyn Profiler>> = vec![
            Arc::new(GcEventProfiler::new(
                "GCEventProfiler",
                &target,
                providers,
                GcEventDecoder::new(),
                options.gc_event,
            )),
            Arc::new(ThreadPoolEventProfiler::new(
                "ThreadPoolEventProfiler",
                &target,
                providers,
                ThreadPoolDecoder::new(),
                options.thread_pool_event,
            )),
            Arc::new(ContentionEventProfiler::new(
                "ContentionEventProfiler",
                &target,
                providers,
                ContentionDecoder::new(),
                options.contention_event,
            )),
            Arc::new(ThreadInfoTimerProfiler::new(
                "ThreadInfoTimerProfiler",
                timer.clone(),
                options.timer,
                options.thread_pool_probe.map(ThreadInfoSampler::new),
                options.thread_info,
            )),
            Arc::new(GcInfoTimerProfiler::new(
                "GCInfoTimerProfiler",
                timer.clone(),
                options.timer,
                options.gc_heap_probe.map(GcInfoSampler::new),
                options.gc_info,
            )),
            Arc::new(ProcessInfoTimerProfiler::new(
                "ProcessInfoTimerProfiler",
                timer,
                options.timer,
                options.process_probe.map(ProcessInfoSampler::new),
                options.process_info,
            )),
        ];

        Ok(Tracker {
            profilers,
            active: Arc::new(AtomicU64::new(0)),
            generation: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            token: RwLock::new(CancellationToken::new()),
            runtime: options.runtime,
        })
    }

    /// Returns the tracker bound as current, if any.
    pub fn current() -> Option<Arc<Tracker>> {
        CURRENT
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Binds a tracker as current and returns the previous one.
    pub fn bind(tracker: Option<Arc<Tracker>>) -> Option<Arc<Tracker>> {
        let mut current = CURRENT.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, tracker)
    }

    /// Starts all profilers and their read loops.
    ///
    /// Concurrent and repeated calls are no-ops until the token is cancelled
    /// and replaced through [`reset`](Self::reset). Read loops are spawned on
    /// the configured runtime, or on the runtime this is called from.
    pub fn start(&self) -> Result<(), Error> {
        let handle = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current()
                .map_err(|_| Error::config("starting a tracker needs a tokio runtime"))?,
        };

        let token = self.token();
        if token.is_cancelled() {
            diag_debug!("[Tracker] start ignored, the token was cancelled");
            return Ok(());
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        if self
            .active
            .compare_exchange(0, generation, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }
        self.stopped.store(false, Ordering::Release);

        for profiler in &self.profilers {
            profiler.start();
        }
        for profiler in self.profilers.iter().filter(|p| p.enabled()) {
            let task = handle.spawn(profiler.read_result(token.clone()));
            handle.spawn(supervise(profiler.clone(), task));
        }

        let active = self.active.clone();
        handle.spawn(async move {
            token.cancelled().await;
            active
                .compare_exchange(generation, 0, Ordering::AcqRel, Ordering::Acquire)
                .ok();
        });
        Ok(())
    }

    /// Re-arms all profilers. A no-op unless the tracker is started.
    pub fn restart(&self) {
        if !self.is_started() {
            return;
        }
        self.stopped.store(false, Ordering::Release);
        for profiler in &self.profilers {
            profiler.restart();
        }
    }

    /// Disarms all profilers. A no-op unless the tracker is started.
    ///
    /// Read loops are not woken. A loop parked on an empty channel keeps
    /// waiting and resumes once the profilers are restarted. A loop that is
    /// draining records when this lands returns after the running callback,
    /// and is only spawned again by a cancel, reset and start cycle.
    pub fn stop(&self) {
        if !self.is_started() {
            return;
        }
        self.stopped.store(true, Ordering::Release);
        for profiler in &self.profilers {
            profiler.stop();
        }
    }

    /// Cancels the shared token, ending all read loops.
    ///
    /// In-flight emit callbacks run to completion.
    pub fn cancel(&self) {
        self.token().cancel();
        self.active.store(0, Ordering::Release);
    }

    /// Replaces a cancelled token so the tracker can be started again.
    ///
    /// Returns `false` and changes nothing if the current token was not
    /// cancelled.
    pub fn reset(&self, token: CancellationToken) -> bool {
        let mut current = self.token.write().unwrap_or_else(PoisonError::into_inner);
        if !current.is_cancelled() {
            return false;
        }
        *current = token;
        self.stopped.store(false, Ordering::Release);
        true
    }

    /// Calls `f` with the name and enabled state of every profiler.
    pub fn status<F: FnMut(&str, bool)>(&self, mut f: F) {
        for profiler in &self.profilers {
            f(profiler.name(), profiler.enabled());
        }
    }

    /// Returns `true` between a successful start and the cancellation of its
    /// token.
    pub fn is_started(&self) -> bool {
        self.active.load(Ordering::Acquire) != 0
    }

    /// The current lifecycle state.
    pub fn state(&self) -> TrackerState {
        if self.is_started() {
            if self.stopped.load(Ordering::Acquire) {
                TrackerState::Stopped
            } else {
                TrackerState::Started
            }
        } else if self.token().is_cancelled() {
            TrackerState::Cancelled
        } else {
            TrackerState::Uninitialized
        }
    }

    /// The token read loops are started with.
    pub fn token(&self) -> CancellationToken {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The profilers, in a fixed order.
    pub fn profilers(&self) -> &[Arc<dyn Profiler>] {
        &self.profilers
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        // read loops, supervisors and the watcher all end on the token
        self.token
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }
}

async fn supervise(profiler: Arc<dyn Profiler>, task: JoinHandle<Result<(), BoxError>>) {
    let err = match task.await {
        Ok(Ok(())) => return,
        Ok(Err(source)) => CallbackError::Failed {
            profiler: profiler.name(),
            source,
        },
        Err(join) if join.is_panic() => CallbackError::Panicked {
            profiler: profiler.name(),
            message: panic_message(&*join.into_panic()),
        },
        // the runtime is shutting down
        Err(_) => return,
    };
    diag_debug!("[Tracker] read loop of {} ended: {err}", profiler.name());
    profiler.report_error(&Error::Callback(err));
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let profilers: Vec<_> = self
            .profilers
            .iter()
            .map(|p| (p.name(), p.enabled()))
            .collect();
        f.debug_struct("Tracker")
            .field("state", &self.state())
            .field("profilers", &profilers)
            .finish()
    }
}
