//! A reference counted timer shared by all timer listeners.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, LazyLock, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::options::TimerOptions;

type Tick = Arc<dyn Fn() + Send + Sync>;

/// Identifies a tick subscriber on a [`SharedTimer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickId(u64);

static GLOBAL: LazyLock<Arc<SharedTimer>> = LazyLock::new(|| Arc::new(SharedTimer::new()));

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Worker {
    shutdown: Arc<(Mutex<bool>, Condvar)>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn spawn(ticks: Arc<Mutex<Vec<(TickId, Tick)>>>, options: TimerOptions) -> io::Result<Self> {
        #[allow(clippy::mutex_atomic)]
        let shutdown = Arc::new((Mutex::new(false), Condvar::new()));
        let worker_shutdown = shutdown.clone();
        let handle = std::thread::Builder::new()
            .name("runtime-diag-timer".into())
            .spawn(move || {
                let (lock, cvar) = worker_shutdown.as_ref();
                let mut next = Instant::now() + options.due_time;
                let mut stopped = self::lock(lock);
                loop {
                    // check before waiting, the timer may be released right away
                    if *stopped {
                        return;
                    }
                    let timeout = next.saturating_duration_since(Instant::now());
                    if !timeout.is_zero() {
                        stopped = cvar
                            .wait_timeout(stopped, timeout)
                            .unwrap_or_else(PoisonError::into_inner)
                            .0;
                        continue;
                    }

                    drop(stopped);
                    let subscribers: Vec<Tick> =
                        self::lock(&ticks).iter().map(|(_, t)| t.clone()).collect();
                    for tick in subscribers {
                        tick();
                    }
                    stopped = self::lock(lock);

                    next += options.interval;
                    let now = Instant::now();
                    if next < now {
                        next = now + options.interval;
                    }
                }
            })?;
        Ok(Worker { shutdown, handle })
    }

    fn stop(self) {
        let (lock, cvar) = self.shutdown.as_ref();
        *self::lock(lock) = true;
        cvar.notify_one();

        // a tick releasing the last reference runs on the worker itself
        if self.handle.thread().id() != std::thread::current().id() {
            self.handle.join().ok();
        }
    }
}

/// One timer thread shared by any number of subscribers.
///
/// The timer is a resource pool: every [`acquire`](Self::acquire) takes a
/// reference and every [`release`](Self::release) gives one back. The first
/// reference starts the worker thread with the acquirer's due time and
/// interval; dropping the last reference stops it. Each tick runs all
/// registered subscribers in registration order.
pub struct SharedTimer {
    refs: AtomicUsize,
    next_id: AtomicU64,
    ticks: Arc<Mutex<Vec<(TickId, Tick)>>>,
    worker: Mutex<Option<Worker>>,
}

impl SharedTimer {
    /// Creates an idle timer.
    pub fn new() -> Self {
        SharedTimer {
            refs: AtomicUsize::new(0),
            next_id: AtomicU64::new(0),
            ticks: Arc::new(Mutex::new(Vec::new())),
            worker: Mutex::new(None),
        }
    }

    /// The process-wide timer.
    pub fn global() -> Arc<SharedTimer> {
        GLOBAL.clone()
    }

    /// Adds a tick subscriber.
    pub fn register<F>(&self, tick: F) -> TickId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = TickId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.ticks).push((id, Arc::new(tick)));
        id
    }

    /// Removes a tick subscriber.
    pub fn unregister(&self, id: TickId) {
        lock(&self.ticks).retain(|(tick_id, _)| *tick_id != id);
    }

    /// Takes a reference, starting the worker thread if this is the first.
    ///
    /// `options` only apply when the worker is started by this call.
    pub fn acquire(&self, options: TimerOptions) -> io::Result<()> {
        if self.refs.fetch_add(1, Ordering::AcqRel) == 0 {
            diag_debug!(
                "[SharedTimer] starting, due in {:?}, every {:?}",
                options.due_time,
                options.interval
            );
        }
        if let Err(err) = self.reconcile(options) {
            self.refs.fetch_sub(1, Ordering::AcqRel);
            return Err(err);
        }
        Ok(())
    }

    /// Gives a reference back, stopping the worker thread if it was the last.
    pub fn release(&self) {
        let previous = self
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |refs| refs.checked_sub(1));
        if previous == Ok(1) {
            diag_debug!("[SharedTimer] last reference released, stopping");
            self.reconcile(TimerOptions::default()).ok();
        }
    }

    /// Starts or stops the worker to match the reference count.
    ///
    /// Concurrent acquire and release calls may interleave between the
    /// counter update and this point, so the count is re-read under the lock.
    fn reconcile(&self, options: TimerOptions) -> io::Result<()> {
        let mut worker = lock(&self.worker);
        let refs = self.refs.load(Ordering::Acquire);
        if refs > 0 && worker.is_none() {
            *worker = Some(Worker::spawn(self.ticks.clone(), options)?);
        } else if refs == 0 {
            if let Some(stopping) = worker.take() {
                drop(worker);
                stopping.stop();
            }
        }
        Ok(())
    }

    /// The number of outstanding references.
    pub fn ref_count(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    /// Returns `true` while the worker thread runs.
    pub fn is_running(&self) -> bool {
        lock(&self.worker).is_some()
    }
}

impl Default for SharedTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTimer")
            .field("refs", &self.ref_count())
            .field("subscribers", &lock(&self.ticks).len())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for SharedTimer {
    fn drop(&mut self) {
        if let Some(worker) = lock(&self.worker).take() {
            worker.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn options(due_ms: u64, interval_ms: u64) -> TimerOptions {
        TimerOptions {
            due_time: Duration::from_millis(due_ms),
            interval: Duration::from_millis(interval_ms),
        }
    }

    #[test]
    fn test_ref_counted_worker() {
        let timer = SharedTimer::new();
        assert!(!timer.is_running());

        timer.acquire(options(0, 10)).unwrap();
        timer.acquire(options(0, 10)).unwrap();
        assert_eq!(timer.ref_count(), 2);
        assert!(timer.is_running());

        timer.release();
        assert!(timer.is_running());
        timer.release();
        assert_eq!(timer.ref_count(), 0);
        assert!(!timer.is_running());

        // extra releases do not underflow
        timer.release();
        assert_eq!(timer.ref_count(), 0);

        // the worker can be started again
        timer.acquire(options(0, 10)).unwrap();
        assert!(timer.is_running());
        timer.release();
    }

    #[test]
    fn test_ticks_reach_subscribers() {
        let timer = SharedTimer::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let id = timer.register(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        timer.acquire(options(0, 5)).unwrap();
        std::thread::sleep(Duration::from_millis(60));
        timer.release();
        let seen = hits.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected several ticks, got {seen}");

        // no ticks once stopped
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(hits.load(Ordering::SeqCst), seen);

        timer.unregister(id);
        timer.acquire(options(0, 5)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        timer.release();
        assert_eq!(hits.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn test_due_time_delays_first_tick() {
        let timer = SharedTimer::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        timer.register(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        timer.acquire(options(10_000, 5)).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        timer.release();
    }
}
