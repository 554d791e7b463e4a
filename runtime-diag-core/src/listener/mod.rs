//! Listeners turn native events or timer ticks into buffered statistics
//! records and drain them into a user callback.
//!
//! Both variants share the same shape: an `enabled` flag, an
//! [`EventChannel`] written from the producing thread, and a read loop that
//! forwards buffered records to the emit callback.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

use crate::channel::EventChannel;
use crate::error::{BoxError, Error};
use crate::options::{EmitCallback, ErrorCallback};

mod event;
mod timer;

pub use self::event::EventListener;
pub use self::timer::TimerListener;

/// Drains `channel` into `emit` until the token is cancelled, the channel is
/// closed, or `enabled` is cleared.
///
/// Both the token and `enabled` are checked before every record, so a busy
/// channel does not keep the loop alive. A callback already running is
/// awaited. A loop that ends because `enabled` was cleared is gone for good;
/// only a loop parked on an empty channel picks up again once `enabled` is
/// set.
///
/// Errors returned by the callback end the loop and are handed to the
/// caller; they are not reported to the error callback here.
pub(crate) async fn read_loop<T>(
    enabled: &AtomicBool,
    channel: &EventChannel<T>,
    emit: &EmitCallback<T>,
    token: &CancellationToken,
) -> Result<(), BoxError> {
    while enabled.load(Ordering::Acquire) && channel.wait_to_read(token).await {
        while enabled.load(Ordering::Acquire) && !token.is_cancelled() {
            let Some(record) = channel.try_read() else {
                break;
            };
            emit(record).await?;
        }
    }
    Ok(())
}

/// Hands an error to the error callback, if any.
///
/// This runs on native and timer threads, so a panicking error callback is
/// contained here.
pub(crate) fn report(on_error: Option<&ErrorCallback>, err: &Error) {
    match on_error {
        Some(on_error) => {
            if catch_unwind(AssertUnwindSafe(|| on_error(err))).is_err() {
                diag_debug!("error callback panicked while reporting: {err}");
            }
        }
        None => diag_debug!("unreported error: {err}"),
    }
}
