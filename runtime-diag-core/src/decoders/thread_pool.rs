use runtime_diag_types::protocol::{
    ThreadPoolAdjustmentStatistics, ThreadPoolEventStatistics, ThreadPoolWorkerStatistics,
};
use runtime_diag_types::{EventKeywords, RawEvent};

use super::Decode;
use crate::error::DecodeError;

const ADJUSTMENT_EVENT: &str = "ThreadPoolWorkerThreadAdjustmentAdjustment";

/// Decodes thread pool worker start/stop and worker count adjustments.
#[derive(Debug, Default)]
pub struct ThreadPoolDecoder {
    _private: (),
}

impl ThreadPoolDecoder {
    /// Creates a decoder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decode for ThreadPoolDecoder {
    type Output = ThreadPoolEventStatistics;
    const KEYWORDS: EventKeywords = EventKeywords::THREADING;

    fn decode(
        &mut self,
        event: &RawEvent,
    ) -> Result<Option<ThreadPoolEventStatistics>, DecodeError> {
        if event.name.eq_ignore_ascii_case(ADJUSTMENT_EVENT) {
            // AverageThroughput, NewWorkerThreadCount, Reason
            let average_throughput = event.payload_f64(0)?;
            let new_worker_threads = event.payload_u32(1)?;
            let reason = event.payload_u32(2)?;
            return Ok(Some(ThreadPoolEventStatistics::Adjustment(
                ThreadPoolAdjustmentStatistics {
                    timestamp: event.timestamp,
                    average_throughput,
                    new_worker_threads,
                    reason,
                },
            )));
        }

        if event.name_starts_with("ThreadPoolWorkerThreadStart")
            || event.name_starts_with("ThreadPoolWorkerThreadStop")
        {
            // ActiveWorkerThreadCount, RetiredWorkerThreadCount, ...
            let active_worker_threads = event.payload_u32(0)?;
            return Ok(Some(ThreadPoolEventStatistics::WorkerStartStop(
                ThreadPoolWorkerStatistics {
                    timestamp: event.timestamp,
                    active_worker_threads,
                },
            )));
        }

        // ThreadPoolWorkerThreadWait and friends
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ThreadPoolWorkerThreadStart")]
    #[case("ThreadPoolWorkerThreadStop")]
    #[case("threadpoolworkerthreadstart_V1")]
    fn test_worker_start_stop(#[case] name: &str) {
        let mut decoder = ThreadPoolDecoder::new();
        let event = RawEvent::new(name, 9)
            .with_field("ActiveWorkerThreadCount", 6u32)
            .with_field("RetiredWorkerThreadCount", 0u32);
        assert_eq!(
            decoder.decode(&event).unwrap(),
            Some(ThreadPoolEventStatistics::WorkerStartStop(
                ThreadPoolWorkerStatistics {
                    timestamp: 9,
                    active_worker_threads: 6,
                }
            ))
        );
    }

    #[test]
    fn test_adjustment() {
        let mut decoder = ThreadPoolDecoder::new();
        let event = RawEvent::new(ADJUSTMENT_EVENT, 30)
            .with_field("AverageThroughput", 12.5)
            .with_field("NewWorkerThreadCount", 9u32)
            .with_field("Reason", 6u32);
        let Some(ThreadPoolEventStatistics::Adjustment(stats)) = decoder.decode(&event).unwrap()
        else {
            panic!("expected an adjustment");
        };
        assert_eq!(stats.new_worker_threads, 9);
        assert_eq!(stats.average_throughput, 12.5);
        assert_eq!(stats.reason_str().unwrap(), "starvation");
    }

    #[rstest]
    #[case("ThreadPoolWorkerThreadWait")]
    #[case("ThreadPoolWorkerThreadAdjustmentSample")]
    #[case("ThreadPoolWorkerThreadAdjustmentAdjustment_V2")]
    fn test_ignored_events(#[case] name: &str) {
        let mut decoder = ThreadPoolDecoder::new();
        assert_eq!(decoder.decode(&RawEvent::new(name, 0)).unwrap(), None);
    }
}
