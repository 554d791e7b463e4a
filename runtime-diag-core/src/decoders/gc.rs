use runtime_diag_types::protocol::{GcEventStatistics, GcStartEndStatistics, GcSuspendStatistics};
use runtime_diag_types::{EventKeywords, RawEvent, TICKS_PER_MILLISECOND};

use super::Decode;
use crate::error::DecodeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct GcStart {
    timestamp: i64,
    reason: u32,
    gc_type: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SuspendBegin {
    timestamp: i64,
    reason: u32,
    count: u32,
}

fn ticks_to_ms(start: i64, end: i64) -> f64 {
    end.saturating_sub(start) as f64 / TICKS_PER_MILLISECOND as f64
}

/// Pairs GC start/end and execution engine suspend/restart events.
///
/// Only one cycle of each kind is tracked: a second start overwrites the
/// first, and an end without a start produces nothing.
#[derive(Debug, Default)]
pub struct GcEventDecoder {
    gc_start: Option<GcStart>,
    suspend_begin: Option<SuspendBegin>,
}

impl GcEventDecoder {
    /// Creates a decoder with no cycle in flight.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decode for GcEventDecoder {
    type Output = GcEventStatistics;
    const KEYWORDS: EventKeywords = EventKeywords::GC;

    fn decode(&mut self, event: &RawEvent) -> Result<Option<GcEventStatistics>, DecodeError> {
        if event.name_starts_with("GCStart") {
            // Count, Depth, Reason, Type, ...
            let reason = event.payload_u32(2)?;
            let gc_type = event.payload_u32(3)?;
            self.gc_start = Some(GcStart {
                timestamp: event.timestamp,
                reason,
                gc_type,
            });
            Ok(None)
        } else if event.name_starts_with("GCEnd") {
            // Count, Depth, ...
            let index = event.payload_u32(0)?;
            let generation = event.payload_u32(1)?;
            let Some(start) = self.gc_start.take() else {
                return Ok(None);
            };
            Ok(Some(GcEventStatistics::StartEnd(GcStartEndStatistics {
                index,
                gc_type: start.gc_type,
                generation,
                reason: start.reason,
                duration_ms: ticks_to_ms(start.timestamp, event.timestamp),
                start_time: start.timestamp,
                end_time: event.timestamp,
            })))
        } else if event.name_starts_with("GCSuspendEEBegin") {
            // Reason, Count, ...
            let reason = event.payload_u32(0)?;
            let count = event.payload_u32(1)?;
            self.suspend_begin = Some(SuspendBegin {
                timestamp: event.timestamp,
                reason,
                count,
            });
            Ok(None)
        } else if event.name_starts_with("GCRestartEEEnd") {
            let Some(begin) = self.suspend_begin.take() else {
                return Ok(None);
            };
            Ok(Some(GcEventStatistics::Suspend(GcSuspendStatistics {
                duration_ms: ticks_to_ms(begin.timestamp, event.timestamp),
                reason: begin.reason,
                count: begin.count,
            })))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_start_end_pair() {
        let mut decoder = GcEventDecoder::new();
        assert_eq!(decoder.decode(&gc_start(0, 1, 0)).unwrap(), None);

        let record = decoder.decode(&gc_end(500, 7, 2)).unwrap();
        assert_eq!(
            record,
            Some(GcEventStatistics::StartEnd(GcStartEndStatistics {
                index: 7,
                gc_type: 0,
                generation: 2,
                reason: 1,
                duration_ms: 50.0,
                start_time: 0,
                end_time: 500,
            }))
        );

        // the cycle is consumed
        assert_eq!(decoder.decode(&gc_end(900, 8, 0)).unwrap(), None);
    }

    #[test]
    fn test_end_without_start() {
        let mut decoder = GcEventDecoder::new();
        assert_eq!(decoder.decode(&gc_end(500, 7, 2)).unwrap(), None);
    }

    #[test]
    fn test_latest_start_wins() {
        let mut decoder = GcEventDecoder::new();
        decoder.decode(&gc_start(100, 0, 0)).unwrap();
        decoder.decode(&gc_start(300, 4, 1)).unwrap();
        let Some(GcEventStatistics::StartEnd(stats)) = decoder.decode(&gc_end(400, 2, 0)).unwrap()
        else {
            panic!("expected a start/end record");
        };
        assert_eq!(stats.reason, 4);
        assert_eq!(stats.gc_type, 1);
        assert_eq!(stats.duration_ms, 10.0);
    }

    #[test]
    fn test_suspend_pair() {
        let mut decoder = GcEventDecoder::new();
        let begin = RawEvent::new("GCSuspendEEBegin_V1", 1000)
            .with_field("Reason", 1u32)
            .with_field("Count", 12u32);
        assert_eq!(decoder.decode(&begin).unwrap(), None);

        let record = decoder
            .decode(&RawEvent::new("GCRestartEEEnd_V1", 1025))
            .unwrap();
        assert_eq!(
            record,
            Some(GcEventStatistics::Suspend(GcSuspendStatistics {
                duration_ms: 2.5,
                reason: 1,
                count: 12,
            }))
        );
    }

    #[test]
    fn test_malformed_payload_keeps_state() {
        let mut decoder = GcEventDecoder::new();
        decoder.decode(&gc_start(0, 1, 0)).unwrap();

        let broken = RawEvent::new("GCEnd_V1", 500).with_field("Count", "seven");
        assert!(decoder.decode(&broken).is_err());

        assert!(decoder.decode(&gc_end(500, 7, 2)).unwrap().is_some());
    }

    #[test]
    fn test_unrelated_events() {
        let mut decoder = GcEventDecoder::new();
        assert_eq!(
            decoder.decode(&RawEvent::new("GCHeapStats_V2", 1)).unwrap(),
            None
        );
    }
}
