use std::sync::{Arc, Mutex};
use std::time::Duration;

use runtime_diag::protocol::{
    GcEventStatistics, GcStartEndStatistics, ProcessInfoStatistics, ThreadPoolEventStatistics,
};
use runtime_diag::test::{collecting_callback, FakeProvider};
use runtime_diag::types::RawEvent;
use runtime_diag::{
    emit_fn, Callbacks, CancellationToken, SharedTimer, Tracker, TrackerOptions, TrackerState,
    CHANNEL_CAPACITY,
};

fn gc_start(timestamp: i64, reason: u32, gc_type: u32) -> RawEvent {
    RawEvent::new("GCStart_V2", timestamp)
        .with_field("Count", 7u32)
        .with_field("Depth", 2u32)
        .with_field("Reason", reason)
        .with_field("Type", gc_type)
}

fn gc_end(timestamp: i64, index: u32, generation: u32) -> RawEvent {
    RawEvent::new("GCEnd_V1", timestamp)
        .with_field("Count", index)
        .with_field("Depth", generation)
}

fn worker_start(timestamp: i64) -> RawEvent {
    RawEvent::new("ThreadPoolWorkerThreadStart", timestamp)
        .with_field("ActiveWorkerThreadCount", 4u32)
        .with_field("RetiredWorkerThreadCount", 0u32)
}

async fn wait_until<F: Fn() -> bool>(done: F) {
    for _ in 0..400 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_gc_start_end_reaches_callback() {
    let provider = FakeProvider::runtime();
    let (emit, received) = collecting_callback::<GcEventStatistics>();
    let tracker = Tracker::new(
        TrackerOptions::new()
            .with_provider(provider.clone())
            .with_gc_event(Callbacks::new(emit)),
    )
    .unwrap();
    tracker.start().unwrap();

    provider.emit(&gc_start(0, 1, 0));
    provider.emit(&gc_end(500, 7, 2));
    // a start with no end yields nothing
    provider.emit(&gc_start(900, 0, 0));
    wait_until(|| !received.lock().unwrap().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(
        *received.lock().unwrap(),
        vec![GcEventStatistics::StartEnd(GcStartEndStatistics {
            index: 7,
            gc_type: 0,
            generation: 2,
            reason: 1,
            duration_ms: 50.0,
            start_time: 0,
            end_time: 500,
        })]
    );
    tracker.cancel();
}

#[tokio::test]
async fn test_slow_consumer_sees_newest_records() {
    let provider = FakeProvider::runtime();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let tracker = Tracker::new(
        TrackerOptions::new()
            .with_provider(provider.clone())
            .with_thread_pool_event(Callbacks::new(emit_fn(
                move |stats: ThreadPoolEventStatistics| {
                    let sink = sink.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(1)).await;
                        sink.lock().unwrap().push(stats);
                        Ok(())
                    }
                },
            ))),
    )
    .unwrap();
    tracker.start().unwrap();

    // the read loop cannot run before the test yields
    for timestamp in 0..60 {
        provider.emit(&worker_start(timestamp));
    }
    wait_until(|| received.lock().unwrap().len() >= CHANNEL_CAPACITY).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let timestamps: Vec<i64> = received
        .lock()
        .unwrap()
        .iter()
        .map(|stats| match stats {
            ThreadPoolEventStatistics::WorkerStartStop(worker) => worker.timestamp,
            ThreadPoolEventStatistics::Adjustment(adjustment) => adjustment.timestamp,
        })
        .collect();
    assert_eq!(timestamps, (10..60).collect::<Vec<_>>());
    tracker.cancel();
}

#[tokio::test]
async fn test_stopped_tracker_drops_events() {
    let provider = FakeProvider::runtime();
    let (emit, received) = collecting_callback::<ThreadPoolEventStatistics>();
    let tracker = Tracker::new(
        TrackerOptions::new()
            .with_provider(provider.clone())
            .with_thread_pool_event(Callbacks::new(emit)),
    )
    .unwrap();
    tracker.start().unwrap();

    tracker.stop();
    assert_eq!(tracker.state(), TrackerState::Stopped);
    provider.emit(&worker_start(1));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(received.lock().unwrap().is_empty());

    tracker.restart();
    provider.emit(&worker_start(2));
    wait_until(|| !received.lock().unwrap().is_empty()).await;
    assert_eq!(received.lock().unwrap().len(), 1);
    tracker.cancel();
}

#[tokio::test]
async fn test_cancel_reset_start_cycle() {
    let provider = FakeProvider::runtime();
    let (emit, received) = collecting_callback::<ThreadPoolEventStatistics>();
    let tracker = Tracker::new(
        TrackerOptions::new()
            .with_provider(provider.clone())
            .with_thread_pool_event(Callbacks::new(emit)),
    )
    .unwrap();

    tracker.start().unwrap();
    tracker.cancel();
    assert!(!tracker.is_started());

    // buffered while no read loop runs
    provider.emit(&worker_start(1));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(received.lock().unwrap().is_empty());

    assert!(tracker.reset(CancellationToken::new()));
    tracker.start().unwrap();
    wait_until(|| !received.lock().unwrap().is_empty()).await;
    assert_eq!(received.lock().unwrap().len(), 1);
    tracker.cancel();
}

#[tokio::test]
async fn test_process_info_is_sampled() {
    let timer = Arc::new(SharedTimer::new());
    let (emit, received) = collecting_callback::<ProcessInfoStatistics>();
    let tracker = Tracker::new(
        TrackerOptions::new()
            .with_process_info(Callbacks::new(emit))
            .with_process_probe(runtime_diag::probes::OsProcessProbe::new())
            .with_shared_timer(timer.clone())
            .with_timer(Duration::ZERO, Duration::from_millis(10)),
    )
    .unwrap();
    tracker.start().unwrap();
    assert_eq!(timer.ref_count(), 1);

    wait_until(|| received.lock().unwrap().len() >= 2).await;
    {
        let received = received.lock().unwrap();
        assert!(received.len() >= 2);
        // the first sample only sets the CPU baseline
        assert_eq!(received[0].cpu_percent, 0.0);
        assert!(received[0].working_set_bytes > 0);
    }

    tracker.cancel();
    // let the cancelled read loops finish and drop their profiler handles
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(tracker);
    assert_eq!(timer.ref_count(), 0);
    assert!(!timer.is_running());
}

#[test]
fn test_init_binds_current() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()
        .unwrap();
    let guard = runtime_diag::init(
        TrackerOptions::new()
            .with_runtime(runtime.handle().clone())
            .with_shared_timer(Arc::new(SharedTimer::new()))
            .with_process_info(Callbacks::new(emit_fn(|_| async { Ok(()) }))),
    )
    .unwrap();

    let current = Tracker::current().unwrap();
    assert!(Arc::ptr_eq(&current, guard.tracker()));
    assert!(current.is_started());
    drop(current);

    drop(guard);
    assert!(Tracker::current().is_none());
}
