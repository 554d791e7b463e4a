use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// The number of records a listener buffers before dropping the oldest.
pub const CHANNEL_CAPACITY: usize = 50;

/// A bounded single-producer/single-consumer queue that drops the oldest
/// record to admit a new one when full.
///
/// Writes never block, so the channel can be fed from a native callback
/// thread. Ordering is preserved among the records that are delivered.
pub struct EventChannel<T> {
    queue: Mutex<VecDeque<T>>,
    capacity: usize,
    readable: Notify,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl<T> EventChannel<T> {
    /// Creates a channel holding [`CHANNEL_CAPACITY`] records.
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    /// Creates a channel holding `capacity` records (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        EventChannel {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            readable: Notify::new(),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes a record, evicting the oldest one if the channel is full.
    ///
    /// Returns `false` only once the channel is closed.
    pub fn try_write(&self, record: T) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        let mut queue = self.queue();
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(record);
        drop(queue);
        self.readable.notify_one();
        true
    }

    /// Waits until a record is available.
    ///
    /// Returns `false` if `token` is cancelled, or if the channel is closed
    /// and drained.
    pub async fn wait_to_read(&self, token: &CancellationToken) -> bool {
        loop {
            if token.is_cancelled() {
                return false;
            }
            if !self.is_empty() {
                return true;
            }
            if self.is_closed() {
                return false;
            }
            // A write between the checks above and here leaves a permit
            // behind, so the wakeup is not lost.
            tokio::select! {
                biased;
                _ = token.cancelled() => return false,
                _ = self.readable.notified() => {}
            }
        }
    }

    /// Pops the oldest record without waiting.
    pub fn try_read(&self) -> Option<T> {
        self.queue().pop_front()
    }

    /// Closes the channel. Buffered records can still be read.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.readable.notify_waiters();
        self.readable.notify_one();
    }

    /// Returns `true` once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// The number of buffered records.
    pub fn len(&self) -> usize {
        self.queue().len()
    }

    /// Returns `true` if no record is buffered.
    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }

    /// The maximum number of buffered records.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of records evicted so far to make room for newer ones.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_drop_oldest() {
        let channel = EventChannel::new();
        for i in 0..60 {
            assert!(channel.try_write(i));
        }
        assert_eq!(channel.len(), CHANNEL_CAPACITY);
        assert_eq!(channel.dropped(), 10);

        let drained: Vec<i32> = std::iter::from_fn(|| channel.try_read()).collect();
        assert_eq!(drained, (10..60).collect::<Vec<_>>());
        assert!(channel.try_read().is_none());
    }

    #[test]
    fn test_under_capacity_keeps_everything() {
        let channel = EventChannel::with_capacity(3);
        channel.try_write("a");
        channel.try_write("b");
        assert_eq!(channel.try_read(), Some("a"));
        assert_eq!(channel.try_read(), Some("b"));
        assert_eq!(channel.dropped(), 0);
    }

    #[tokio::test]
    async fn test_wait_to_read_wakes_on_write() {
        let channel = Arc::new(EventChannel::new());
        let token = CancellationToken::new();

        let writer = channel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            writer.try_write(42u32);
        });

        assert!(channel.wait_to_read(&token).await);
        assert_eq!(channel.try_read(), Some(42));
    }

    #[tokio::test]
    async fn test_wait_to_read_cancelled() {
        let channel = Arc::new(EventChannel::<u32>::new());
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        assert!(!channel.wait_to_read(&token).await);

        // a cancelled token wins over buffered records
        channel.try_write(1);
        assert!(!channel.wait_to_read(&token).await);
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let channel = EventChannel::new();
        let token = CancellationToken::new();
        channel.try_write(1u8);
        channel.close();

        assert!(!channel.try_write(2));
        assert!(channel.wait_to_read(&token).await);
        assert_eq!(channel.try_read(), Some(1));
        assert!(!channel.wait_to_read(&token).await);
    }
}
