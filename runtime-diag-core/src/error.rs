use std::any::Any;

use runtime_diag_types::PayloadError;
use thiserror::Error;

/// A type-erased error, as returned by emit callbacks and probes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error turning a native event into a statistics record.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A payload field is missing or has an unexpected type.
    #[error(transparent)]
    Payload(#[from] PayloadError),
    /// The decoder panicked.
    #[error("decoding `{event}` panicked: {message}")]
    Panicked {
        /// The event being decoded.
        event: String,
        /// The panic message.
        message: String,
    },
}

/// An error reading runtime or process counters on a timer tick.
#[derive(Debug, Error)]
pub enum SamplingError {
    /// A probe failed to read its counters.
    #[error("{probe} probe failed: {source}")]
    Probe {
        /// The probe that failed.
        probe: &'static str,
        /// The underlying error.
        #[source]
        source: BoxError,
    },
    /// The counters are not available on this runtime or platform.
    #[error("{0} is not supported by the configured probe")]
    Unsupported(&'static str),
    /// The sampler panicked.
    #[error("{sampler} sampler panicked: {message}")]
    Panicked {
        /// The sampler that panicked.
        sampler: &'static str,
        /// The panic message.
        message: String,
    },
}

impl SamplingError {
    /// Wraps a probe error.
    pub fn probe<E: Into<BoxError>>(probe: &'static str, err: E) -> Self {
        SamplingError::Probe {
            probe,
            source: err.into(),
        }
    }
}

/// An error raised by a user emit callback.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// The callback returned an error.
    #[error("{profiler} callback failed: {source}")]
    Failed {
        /// The profiler whose read loop ran the callback.
        profiler: &'static str,
        /// The error returned by the callback.
        #[source]
        source: BoxError,
    },
    /// The callback panicked.
    #[error("{profiler} callback panicked: {message}")]
    Panicked {
        /// The profiler whose read loop ran the callback.
        profiler: &'static str,
        /// The panic message.
        message: String,
    },
}

/// The error type of this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// See [`DecodeError`].
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// See [`SamplingError`].
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    /// See [`CallbackError`].
    #[error(transparent)]
    Callback(#[from] CallbackError),
    /// The tracker or one of its profilers was misconfigured.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }
}

/// Extracts the message of a caught panic.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err: Error = SamplingError::Unsupported("generation sizes").into();
        assert_eq!(
            err.to_string(),
            "generation sizes is not supported by the configured probe"
        );

        let err: Error = CallbackError::Failed {
            profiler: "GCEventProfiler",
            source: "sink closed".into(),
        }
        .into();
        assert_eq!(err.to_string(), "GCEventProfiler callback failed: sink closed");

        assert_eq!(
            Error::config("no callbacks").to_string(),
            "invalid configuration: no callbacks"
        );
    }

    #[test]
    fn test_panic_message() {
        let payload = std::panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(&*payload), "boom 1");
        let payload = std::panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(&*payload), "static");
    }
}
