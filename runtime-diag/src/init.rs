use std::sync::Arc;

use runtime_diag_core::diag_debug;

use crate::{apply_defaults, Error, Tracker, TrackerOptions};

/// Helper struct that is returned from [`init`].
///
/// When this is dropped the tracker is cancelled and unbound.
#[must_use = "when the init guard is dropped tracking is cancelled. If you do want to ignore \
              this use mem::forget on it."]
pub struct TrackerGuard(Arc<Tracker>);

impl TrackerGuard {
    /// The tracker started by [`init`].
    pub fn tracker(&self) -> &Arc<Tracker> {
        &self.0
    }
}

impl Drop for TrackerGuard {
    fn drop(&mut self) {
        diag_debug!("dropping tracker guard -> cancelling tracker");
        self.0.cancel();
        if Tracker::current().is_some_and(|current| Arc::ptr_eq(&current, &self.0)) {
            Tracker::bind(None);
        }
    }
}

/// Creates a tracker for the given options, binds it as current and starts
/// it.
///
/// Options go through [`apply_defaults`] first. Must be called from within a
/// tokio runtime unless the options carry a runtime handle.
///
/// # Examples
///
/// ```
/// use runtime_diag::{Callbacks, TrackerOptions};
///
/// let runtime = tokio::runtime::Runtime::new().unwrap();
/// let guard = runtime_diag::init(
///     TrackerOptions::new()
///         .with_runtime(runtime.handle().clone())
///         .with_process_info(Callbacks::new(runtime_diag::emit_fn(|_| async { Ok(()) }))),
/// )
/// .unwrap();
/// assert!(guard.tracker().is_started());
/// ```
pub fn init(options: TrackerOptions) -> Result<TrackerGuard, Error> {
    let tracker = Arc::new(Tracker::new(apply_defaults(options))?);
    Tracker::bind(Some(tracker.clone()));
    tracker.start()?;
    diag_debug!("started {tracker:?}");
    Ok(TrackerGuard(tracker))
}
