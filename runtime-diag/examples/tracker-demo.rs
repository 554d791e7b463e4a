use std::time::Duration;

use runtime_diag::sink::{json_emit, log_callbacks, log_error};
use runtime_diag::test::FakeProvider;
use runtime_diag::types::RawEvent;
use runtime_diag::{Callbacks, TrackerOptions};

#[tokio::main]
async fn main() -> Result<(), runtime_diag::Error> {
    let mut log_builder = pretty_env_logger::formatted_builder();
    log_builder.parse_filters("info");
    log_builder.init();

    // stands in for the runtime's event source
    let provider = FakeProvider::runtime();

    let guard = runtime_diag::init(
        TrackerOptions::new()
            .with_provider(provider.clone())
            .with_gc_event(log_callbacks())
            .with_thread_pool_event(log_callbacks())
            .with_process_info(Callbacks::new(json_emit()).with_error(log_error()))
            .with_thread_info(log_callbacks())
            .with_timer(Duration::ZERO, Duration::from_millis(500)),
    )?;
    guard.tracker().status(|name, enabled| log::info!("{name}: {enabled}"));

    for cycle in 0..5u32 {
        let start = i64::from(cycle) * 10_000;
        provider.emit(
            &RawEvent::new("GCStart_V2", start)
                .with_field("Count", cycle)
                .with_field("Depth", 0u32)
                .with_field("Reason", 0u32)
                .with_field("Type", 0u32),
        );
        provider.emit(
            &RawEvent::new("GCEnd_V1", start + 350)
                .with_field("Count", cycle)
                .with_field("Depth", 0u32),
        );
        provider.emit(
            &RawEvent::new("ThreadPoolWorkerThreadStart", start + 400)
                .with_field("ActiveWorkerThreadCount", cycle + 1)
                .with_field("RetiredWorkerThreadCount", 0u32),
        );
        tokio::time::sleep(Duration::from_millis(400)).await;
    }

    Ok(())
}
