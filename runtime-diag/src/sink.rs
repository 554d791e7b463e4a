//! Ready-made callbacks writing statistics through the `log` crate.
//!
//! **Feature:** `log` (*enabled by default*)
//!
//! Records are logged at `info` level with target `runtime_diag::stats`,
//! errors at `error` level with target `runtime_diag::errors`.
//!
//! ```
//! use runtime_diag::protocol::GcEventStatistics;
//! use runtime_diag::sink::{log_callbacks, log_emit, log_error};
//! use runtime_diag::{Callbacks, TrackerOptions};
//!
//! let options = TrackerOptions::new()
//!     .with_gc_event(log_callbacks())
//!     .with_process_info(Callbacks::new(log_emit()).with_error(log_error()));
//! ```

use log::{error, info};
use serde::Serialize;

use crate::protocol::StatisticsRecord;
use crate::{emit_fn, error_fn, BoxError, Callbacks, EmitCallback, ErrorCallback};

const STATS_TARGET: &str = "runtime_diag::stats";
const ERRORS_TARGET: &str = "runtime_diag::errors";

/// An emit callback logging every record in its line format.
pub fn log_emit<T>() -> EmitCallback<T>
where
    T: Into<StatisticsRecord> + Send + 'static,
{
    emit_fn(|stats: T| {
        let record = stats.into();
        info!(target: STATS_TARGET, "{record}");
        async { Ok(()) }
    })
}

/// An emit callback logging every record as a JSON object tagged with its
/// kind.
pub fn json_emit<T>() -> EmitCallback<T>
where
    T: Into<StatisticsRecord> + Send + 'static,
{
    emit_fn(|stats: T| {
        let result = render_json(&stats.into());
        async move {
            let json = result?;
            info!(target: STATS_TARGET, "{json}");
            Ok::<(), BoxError>(())
        }
    })
}

fn render_json<S: Serialize>(record: &S) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}

/// An error callback logging every error.
pub fn log_error() -> ErrorCallback {
    error_fn(|err| error!(target: ERRORS_TARGET, "{err}"))
}

/// [`log_emit`] paired with [`log_error`].
pub fn log_callbacks<T>() -> Callbacks<T>
where
    T: Into<StatisticsRecord> + Send + 'static,
{
    Callbacks::new(log_emit()).with_error(log_error())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ContentionEventStatistics, ContentionFlag};

    #[test]
    fn test_json_shape() {
        let record: StatisticsRecord = ContentionEventStatistics {
            timestamp: 3,
            flag: ContentionFlag::Managed,
            duration_ns: 10.0,
        }
        .into();
        let json = render_json(&record).unwrap();
        assert!(json.starts_with(r#"{"kind":"contention_event","data":{"#));
    }

    #[tokio::test]
    async fn test_callbacks_complete() {
        let emit = json_emit::<ContentionEventStatistics>();
        emit(ContentionEventStatistics {
            timestamp: 1,
            flag: ContentionFlag::Native,
            duration_ns: 1.0,
        })
        .await
        .unwrap();
        log_error()(&crate::Error::Configuration("test".into()));
    }
}
