//! The seam to native event providers.

use std::sync::Arc;

use runtime_diag_types::{EventKeywords, EventLevel, RawEvent};
use uuid::Uuid;

/// Identifies one subscription on a [`NativeProvider`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Receives the events of a subscription.
///
/// `on_event` is called synchronously on whatever thread the provider
/// delivers events on, one event at a time per subscription. It must not
/// block.
pub trait EventSink: Send + Sync + 'static {
    /// Handles one native event.
    fn on_event(&self, event: &RawEvent);
}

/// A source of native runtime events.
///
/// Implementations wrap the runtime's tracing facility, which parses its
/// own payload format and hands over [`RawEvent`]s.
pub trait NativeProvider: Send + Sync + 'static {
    /// The provider name, e.g. [`RUNTIME_PROVIDER_NAME`](runtime_diag_types::RUNTIME_PROVIDER_NAME).
    fn name(&self) -> &str;

    /// The provider identifier.
    fn guid(&self) -> Uuid {
        Uuid::nil()
    }

    /// Starts delivering events of at most `level` verbosity matching
    /// `keywords` to `sink`.
    fn subscribe(
        &self,
        level: EventLevel,
        keywords: EventKeywords,
        sink: Arc<dyn EventSink>,
    ) -> SubscriptionId;

    /// Stops a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}
