use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use runtime_diag_types::{EventKeywords, EventLevel, ProviderTarget, RawEvent};
use tokio_util::sync::CancellationToken;

use super::{read_loop, report};
use crate::channel::EventChannel;
use crate::decoders::Decode;
use crate::error::{panic_message, BoxError, DecodeError, Error};
use crate::options::{Callbacks, EmitCallback, ErrorCallback};
use crate::provider::{EventSink, NativeProvider, SubscriptionId};

struct Shared<D: Decode> {
    enabled: AtomicBool,
    channel: EventChannel<D::Output>,
    decoder: Mutex<D>,
    emit: EmitCallback<D::Output>,
    on_error: Option<ErrorCallback>,
}

impl<D: Decode> EventSink for Shared<D> {
    fn on_event(&self, event: &RawEvent) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }

        let decoded = catch_unwind(AssertUnwindSafe(|| {
            self.decoder
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .decode(event)
        }));
        let err = match decoded {
            Ok(Ok(Some(record))) => {
                self.channel.try_write(record);
                return;
            }
            Ok(Ok(None)) => return,
            Ok(Err(err)) => err,
            Err(panic) => DecodeError::Panicked {
                event: event.name.clone(),
                message: panic_message(&*panic),
            },
        };
        report(self.on_error.as_ref(), &Error::Decode(err));
    }
}

/// A listener fed by native runtime events.
///
/// On construction it subscribes to every provider matching its target. The
/// subscriptions stay in place until the listener is dropped; stopping only
/// makes the listener ignore incoming events, so re-arming is cheap.
pub struct EventListener<D: Decode> {
    shared: Arc<Shared<D>>,
    subscriptions: Vec<(Arc<dyn NativeProvider>, SubscriptionId)>,
}

impl<D: Decode> EventListener<D> {
    /// Creates a disabled listener and subscribes it to the matching
    /// providers with the decoder's level and keywords.
    pub fn new(
        target: &ProviderTarget,
        providers: &[Arc<dyn NativeProvider>],
        decoder: D,
        callbacks: Callbacks<D::Output>,
    ) -> Self {
        Self::with_filter(target, D::LEVEL, D::KEYWORDS, providers, decoder, callbacks)
    }

    /// Like [`new`](Self::new) with an explicit level and keyword mask.
    pub fn with_filter(
        target: &ProviderTarget,
        level: EventLevel,
        keywords: EventKeywords,
        providers: &[Arc<dyn NativeProvider>],
        decoder: D,
        callbacks: Callbacks<D::Output>,
    ) -> Self {
        let shared = Arc::new(Shared {
            enabled: AtomicBool::new(false),
            channel: EventChannel::new(),
            decoder: Mutex::new(decoder),
            emit: callbacks.emit,
            on_error: callbacks.error,
        });

        let subscriptions = providers
            .iter()
            .filter(|provider| target.matches(provider.name(), provider.guid()))
            .map(|provider| {
                let sink: Arc<dyn EventSink> = shared.clone();
                let id = provider.subscribe(level, keywords, sink);
                diag_debug!("[EventListener] subscribed to {target} ({id:?})");
                (provider.clone(), id)
            })
            .collect();

        EventListener {
            shared,
            subscriptions,
        }
    }

    /// Arms the listener, then runs `startup`.
    pub fn run_with_callback<F: FnOnce()>(&self, startup: F) {
        self.shared.enabled.store(true, Ordering::Release);
        startup();
    }

    /// Disarms the listener. Subscriptions and buffered records are kept.
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

    /// The number of providers this listener subscribed to.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// The buffer between the decoder and the read loop.
    pub fn channel(&self) -> &EventChannel<D::Output> {
        &self.shared.channel
    }

    /// The error callback of this listener.
    pub fn error_callback(&self) -> Option<&ErrorCallback> {
        self.shared.on_error.as_ref()
    }

    /// Returns the read loop draining the channel into the emit callback.
    ///
    /// The returned future does not borrow the listener.
    pub fn read_result(
        &self,
        token: CancellationToken,
    ) -> impl Future<Output = Result<(), BoxError>> + Send + 'static {
        let shared = self.shared.clone();
        async move { read_loop(&shared.enabled, &shared.channel, &shared.emit, &token).await }
    }
}

impl<D: Decode> Drop for EventListener<D> {
    fn drop(&mut self) {
        for (provider, id) in self.subscriptions.drain(..) {
            provider.unsubscribe(id);
        }
    }
}

impl<D: Decode> fmt::Debug for EventListener<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListener")
            .field("enabled", &self.is_enabled())
            .field("subscriptions", &self.subscriptions.len())
            .field("channel", &self.shared.channel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use runtime_diag_types::protocol::{ThreadPoolEventStatistics, ThreadPoolWorkerStatistics};

    use super::*;
    use crate::decoders::ThreadPoolDecoder;
    use crate::options::{emit_fn, error_fn};
    use crate::test::{collecting_callback, FakeProvider};

    fn worker_start(timestamp: i64, active: u32) -> RawEvent {
        RawEvent::new("ThreadPoolWorkerThreadStart", timestamp)
            .with_field("ActiveWorkerThreadCount", active)
            .with_field("RetiredWorkerThreadCount", 0u32)
    }

    #[test]
    fn test_subscribes_to_matching_providers_only() {
        let runtime = FakeProvider::runtime();
        let other = FakeProvider::new("Some-Other-Provider");
        let providers: Vec<Arc<dyn NativeProvider>> = vec![runtime.clone(), other.clone()];
        let (emit, _) = collecting_callback();

        let listener = EventListener::new(
            &ProviderTarget::runtime(),
            &providers,
            ThreadPoolDecoder::new(),
            Callbacks::new(emit),
        );
        assert_eq!(listener.subscription_count(), 1);
        assert_eq!(runtime.subscription_count(), 1);
        assert_eq!(other.subscription_count(), 0);
        assert_eq!(
            runtime.subscriptions()[0].1,
            EventKeywords::THREADING
        );

        drop(listener);
        assert_eq!(runtime.subscription_count(), 0);
    }

    #[test]
    fn test_disabled_listener_ignores_events() {
        let provider = FakeProvider::runtime();
        let providers: Vec<Arc<dyn NativeProvider>> = vec![provider.clone()];
        let (emit, _) = collecting_callback();
        let listener = EventListener::new(
            &ProviderTarget::runtime(),
            &providers,
            ThreadPoolDecoder::new(),
            Callbacks::new(emit),
        );

        provider.emit(&worker_start(1, 1));
        assert!(listener.channel().is_empty());

        let started = Arc::new(Mutex::new(false));
        let flag = started.clone();
        listener.run_with_callback(move || *flag.lock().unwrap() = true);
        assert!(*started.lock().unwrap());

        provider.emit(&worker_start(2, 2));
        assert_eq!(listener.channel().len(), 1);

        listener.stop();
        provider.emit(&worker_start(3, 3));
        assert_eq!(listener.channel().len(), 1);

        listener.restart();
        provider.emit(&worker_start(4, 4));
        assert_eq!(listener.channel().len(), 2);
    }

    #[test]
    fn test_decode_errors_are_reported_and_processing_continues() {
        let provider = FakeProvider::runtime();
        let providers: Vec<Arc<dyn NativeProvider>> = vec![provider.clone()];
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let (emit, _) = collecting_callback();
        let listener = EventListener::new(
            &ProviderTarget::runtime(),
            &providers,
            ThreadPoolDecoder::new(),
            Callbacks::new(emit).with_error(error_fn(move |err| {
                sink.lock().unwrap().push(err.to_string());
            })),
        );
        listener.run_with_callback(|| {});

        provider.emit(&RawEvent::new("ThreadPoolWorkerThreadStart", 1));
        provider.emit(&worker_start(2, 5));

        assert_eq!(
            *errors.lock().unwrap(),
            vec!["event `ThreadPoolWorkerThreadStart` has no payload value at index 0".to_owned()]
        );
        assert_eq!(
            listener.channel().try_read(),
            Some(ThreadPoolEventStatistics::WorkerStartStop(
                ThreadPoolWorkerStatistics {
                    timestamp: 2,
                    active_worker_threads: 5,
                }
            ))
        );
    }

    #[tokio::test]
    async fn test_read_loop_propagates_callback_errors() {
        let provider = FakeProvider::runtime();
        let providers: Vec<Arc<dyn NativeProvider>> = vec![provider.clone()];
        let listener = EventListener::new(
            &ProviderTarget::runtime(),
            &providers,
            ThreadPoolDecoder::new(),
            Callbacks::new(emit_fn(|_: ThreadPoolEventStatistics| async {
                Err::<(), BoxError>("sink unavailable".into())
            })),
        );
        listener.run_with_callback(|| {});
        provider.emit(&worker_start(1, 1));
        provider.emit(&worker_start(2, 2));

        let err = listener
            .read_result(CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "sink unavailable");
        // the second record is still buffered
        assert_eq!(listener.channel().len(), 1);
    }

    #[tokio::test]
    async fn test_read_loop_delivers_in_order_and_stops_on_cancel() {
        let provider = FakeProvider::runtime();
        let providers: Vec<Arc<dyn NativeProvider>> = vec![provider.clone()];
        let (emit, received) = collecting_callback();
        let listener = EventListener::new(
            &ProviderTarget::runtime(),
            &providers,
            ThreadPoolDecoder::new(),
            Callbacks::new(emit),
        );
        listener.run_with_callback(|| {});

        let token = CancellationToken::new();
        let task = tokio::spawn(listener.read_result(token.clone()));
        for i in 0..5 {
            provider.emit(&worker_start(i, i as u32));
        }
        for _ in 0..100 {
            if received.lock().unwrap().len() == 5 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        token.cancel();
        task.await.unwrap().unwrap();

        let timestamps: Vec<i64> = received
            .lock()
            .unwrap()
            .iter()
            .map(|stats| match stats {
                ThreadPoolEventStatistics::WorkerStartStop(w) => w.timestamp,
                ThreadPoolEventStatistics::Adjustment(a) => a.timestamp,
            })
            .collect();
        assert_eq!(timestamps, vec![0, 1, 2, 3, 4]);
    }
}
