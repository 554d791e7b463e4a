use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio_util::sync::CancellationToken;

use super::{read_loop, report};
use crate::channel::EventChannel;
use crate::error::{panic_message, BoxError, Error, SamplingError};
use crate::options::{Callbacks, EmitCallback, ErrorCallback, TimerOptions};
use crate::samplers::Sample;
use crate::timer::{SharedTimer, TickId};

struct Shared<S: Sample> {
    enabled: AtomicBool,
    channel: EventChannel<S::Output>,
    sampler: Mutex<S>,
    emit: EmitCallback<S::Output>,
    on_error: Option<ErrorCallback>,
}

impl<S: Sample> Shared<S> {
    fn tick(&self) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }

        let sampled = catch_unwind(AssertUnwindSafe(|| {
            self.sampler
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .sample()
        }));
        let err = match sampled {
            Ok(Ok(record)) => {
                self.channel.try_write(record);
                return;
            }
            Ok(Err(err)) => err,
            Err(panic) => SamplingError::Panicked {
                sampler: S::NAME,
                message: panic_message(&*panic),
            },
        };
        report(self.on_error.as_ref(), &Error::Sampling(err));
    }
}

/// A listener fed by ticks of a [`SharedTimer`].
///
/// The first [`run_with_callback`](Self::run_with_callback) takes a
/// reference on the timer and registers the sampler; both are given back
/// when the listener is dropped. Stopping only makes ticks skip this
/// listener.
pub struct TimerListener<S: Sample> {
    shared: Arc<Shared<S>>,
    timer: Arc<SharedTimer>,
    options: TimerOptions,
    tick: Mutex<Option<TickId>>,
}

impl<S: Sample> TimerListener<S> {
    /// Creates a disabled listener.
    pub fn new(
        timer: Arc<SharedTimer>,
        options: TimerOptions,
        sampler: S,
        callbacks: Callbacks<S::Output>,
    ) -> Self {
        TimerListener {
            shared: Arc::new(Shared {
                enabled: AtomicBool::new(false),
                channel: EventChannel::new(),
                sampler: Mutex::new(sampler),
                emit: callbacks.emit,
                on_error: callbacks.error,
            }),
            timer,
            options,
            tick: Mutex::new(None),
        }
    }

    /// Arms the listener, attaches it to the timer, then runs `startup`.
    ///
    /// Fails if the timer thread cannot be started; the listener stays
    /// disarmed in that case.
    pub fn run_with_callback<F: FnOnce()>(&self, startup: F) -> Result<(), Error> {
        {
            let mut tick = self.tick.lock().unwrap_or_else(PoisonError::into_inner);
            if tick.is_none() {
                let weak: Weak<Shared<S>> = Arc::downgrade(&self.shared);
                let id = self.timer.register(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.tick();
                    }
                });
                if let Err(err) = self.timer.acquire(self.options) {
                    self.timer.unregister(id);
                    return Err(Error::config(format!(
                        "failed to start the timer thread: {err}"
                    )));
                }
                *tick = Some(id);
            }
        }
        self.shared.enabled.store(true, Ordering::Release);
        startup();
        Ok(())
    }

    /// Disarms the listener. The timer reference and buffered records are
    /// kept.
    pub fn stop(&self) {
        self.shared.enabled.store(false, Ordering::Release);
    }

    /// Re-arms a stopped listener.
    pub fn restart(&self) {
        self.shared.enabled.store(true, Ordering::Release);
    }

    /// Returns `true` while the listener is armed.
    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Acquire)
    }

    /// Runs one sampling pass as if the timer had ticked.
    pub fn tick(&self) {
        self.shared.tick();
    }

    /// The buffer between the sampler and the read loop.
    pub fn channel(&self) -> &EventChannel<S::Output> {
        &self.shared.channel
    }

    /// The error callback of this listener.
    pub fn error_callback(&self) -> Option<&ErrorCallback> {
        self.shared.on_error.as_ref()
    }

    /// Returns the read loop draining the channel into the emit callback.
    pub fn read_result(
        &self,
        token: CancellationToken,
    ) -> impl Future<Output = Result<(), BoxError>> + Send + 'static {
        let shared = self.shared.clone();
        async move { read_loop(&shared.enabled, &shared.channel, &shared.emit, &token).await }
    }
}

impl<S: Sample> Drop for TimerListener<S> {
    fn drop(&mut self) {
        let tick = self
            .tick
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = tick {
            self.timer.unregister(id);
            self.timer.release();
        }
    }
}

impl<S: Sample> fmt::Debug for TimerListener<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerListener")
            .field("sampler", &S::NAME)
            .field("enabled", &self.is_enabled())
            .field("options", &self.options)
            .field("channel", &self.shared.channel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    use super::*;
    use crate::options::error_fn;
    use crate::test::collecting_callback;

    struct Counter {
        next: u32,
        fail_on: Option<u32>,
    }

    impl Sample for Counter {
        type Output = u32;
        const NAME: &'static str = "counter";

        fn sample(&mut self) -> Result<u32, SamplingError> {
            self.next += 1;
            if Some(self.next) == self.fail_on {
                return Err(SamplingError::Unsupported("counting"));
            }
            if self.next == 100 {
                panic!("overflow");
            }
            Ok(self.next)
        }
    }

    fn fast() -> TimerOptions {
        TimerOptions {
            due_time: Duration::ZERO,
            interval: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_manual_ticks_respect_enabled() {
        let (emit, _) = collecting_callback();
        let listener = TimerListener::new(
            Arc::new(SharedTimer::new()),
            fast(),
            Counter {
                next: 0,
                fail_on: None,
            },
            Callbacks::new(emit),
        );

        listener.tick();
        assert!(listener.channel().is_empty());

        listener.shared.enabled.store(true, Ordering::Release);
        listener.tick();
        listener.tick();
        assert_eq!(listener.channel().try_read(), Some(1));
        assert_eq!(listener.channel().try_read(), Some(2));
    }

    #[test]
    fn test_sampling_errors_do_not_stop_ticks() {
        let errors = Arc::new(AtomicU32::new(0));
        let seen = errors.clone();
        let (emit, _) = collecting_callback();
        let listener = TimerListener::new(
            Arc::new(SharedTimer::new()),
            fast(),
            Counter {
                next: 98,
                fail_on: Some(101),
            },
            Callbacks::new(emit).with_error(error_fn(move |err| {
                assert!(matches!(err, Error::Sampling(_)));
                seen.fetch_add(1, Ordering::SeqCst);
            })),
        );
        listener.shared.enabled.store(true, Ordering::Release);

        listener.tick(); // 99
        listener.tick(); // 100 panics
        listener.tick(); // 101 fails
        listener.tick(); // 102
        assert_eq!(errors.load(Ordering::SeqCst), 2);
        assert_eq!(listener.channel().try_read(), Some(99));
        assert_eq!(listener.channel().try_read(), Some(102));
        assert!(listener.channel().is_empty());
    }

    #[test]
    fn test_timer_reference_follows_listener_lifetime() {
        let timer = Arc::new(SharedTimer::new());
        let (emit, _) = collecting_callback();
        let listener = TimerListener::new(
            timer.clone(),
            fast(),
            Counter {
                next: 0,
                fail_on: None,
            },
            Callbacks::new(emit),
        );
        assert_eq!(timer.ref_count(), 0);

        listener.run_with_callback(|| {}).unwrap();
        listener.stop();
        listener.run_with_callback(|| {}).unwrap();
        assert_eq!(timer.ref_count(), 1);
        assert!(timer.is_running());

        std::thread::sleep(Duration::from_millis(50));
        assert!(!listener.channel().is_empty());

        drop(listener);
        assert_eq!(timer.ref_count(), 0);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_two_listeners_share_one_timer() {
        let timer = Arc::new(SharedTimer::new());
        let make = || {
            let (emit, _) = collecting_callback();
            TimerListener::new(
                timer.clone(),
                fast(),
                Counter {
                    next: 0,
                    fail_on: None,
                },
                Callbacks::new(emit),
            )
        };
        let first = make();
        let second = make();
        first.run_with_callback(|| {}).unwrap();
        second.run_with_callback(|| {}).unwrap();
        assert_eq!(timer.ref_count(), 2);

        second.stop();
        std::thread::sleep(Duration::from_millis(50));
        assert!(!first.channel().is_empty());
        assert!(second.channel().is_empty());

        drop(first);
        assert!(timer.is_running());
        drop(second);
        assert!(!timer.is_running());
    }
}
