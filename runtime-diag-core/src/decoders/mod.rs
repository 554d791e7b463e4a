//! Decoders turning native runtime events into statistics records.
//!
//! Event names carry a version suffix (`GCStart_V1`, `GCStart_V2`, ...), so
//! most families are matched by a case insensitive name prefix. A decoder
//! sees every event of its subscription and returns `Ok(None)` for events it
//! does not care about.

use runtime_diag_types::{EventKeywords, EventLevel, RawEvent};

use crate::error::DecodeError;

mod contention;
mod gc;
mod thread_pool;

pub use self::contention::ContentionDecoder;
pub use self::gc::GcEventDecoder;
pub use self::thread_pool::ThreadPoolDecoder;

/// Maps native events to zero or one statistics record.
///
/// Decoders may keep state across events; the provider delivers the events
/// of one subscription one at a time.
pub trait Decode: Send + 'static {
    /// The statistics record produced.
    type Output: Send + 'static;

    /// Verbosity to subscribe with.
    const LEVEL: EventLevel = EventLevel::Informational;

    /// Event categories to subscribe to.
    const KEYWORDS: EventKeywords;

    /// Decodes one event.
    fn decode(&mut self, event: &RawEvent) -> Result<Option<Self::Output>, DecodeError>;
}
