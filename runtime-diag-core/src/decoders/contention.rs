use std::convert::TryFrom;

use runtime_diag_types::protocol::{ContentionEventStatistics, ContentionFlag};
use runtime_diag_types::{EventKeywords, PayloadError, RawEvent};

use super::Decode;
use crate::error::DecodeError;

/// Decodes `ContentionStop` events.
#[derive(Debug, Default)]
pub struct ContentionDecoder {
    _private: (),
}

impl ContentionDecoder {
    /// Creates a decoder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decode for ContentionDecoder {
    type Output = ContentionEventStatistics;
    const KEYWORDS: EventKeywords = EventKeywords::CONTENTION;

    fn decode(
        &mut self,
        event: &RawEvent,
    ) -> Result<Option<ContentionEventStatistics>, DecodeError> {
        if !event.name_starts_with("ContentionStop") {
            return Ok(None);
        }

        // ContentionFlags, ClrInstanceID, DurationNs
        let raw_flag = event.payload_u8(0)?;
        let flag = ContentionFlag::try_from(u32::from(raw_flag)).map_err(|_| {
            PayloadError::Mismatch {
                event: event.name.clone(),
                index: 0,
                expected: "contention flag (0 or 1)",
                found: "unsigned integer",
            }
        })?;
        let duration_ns = event.payload_f64(2)?;

        Ok(Some(ContentionEventStatistics {
            timestamp: event.timestamp,
            flag,
            duration_ns,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(flag: u8, duration_ns: f64) -> RawEvent {
        RawEvent::new("ContentionStop_V1", 42)
            .with_field("ContentionFlags", flag)
            .with_field("ClrInstanceID", 0u16)
            .with_field("DurationNs", duration_ns)
    }

    #[test]
    fn test_contention_stop() {
        let mut decoder = ContentionDecoder::new();
        assert_eq!(
            decoder.decode(&stop(1, 1250.0)).unwrap(),
            Some(ContentionEventStatistics {
                timestamp: 42,
                flag: ContentionFlag::Native,
                duration_ns: 1250.0,
            })
        );
        assert_eq!(
            decoder
                .decode(&RawEvent::new("ContentionStart_V1", 1))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_undefined_flag() {
        let mut decoder = ContentionDecoder::new();
        assert!(matches!(
            decoder.decode(&stop(2, 1.0)),
            Err(DecodeError::Payload(PayloadError::Mismatch { index: 0, .. }))
        ));
    }
}
