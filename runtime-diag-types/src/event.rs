use std::borrow::Cow;
use std::convert::TryFrom;
use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The name of the managed runtime event provider.
pub const RUNTIME_PROVIDER_NAME: &str = "Microsoft-Windows-DotNETRuntime";

/// Number of provider ticks in one millisecond.
pub const TICKS_PER_MILLISECOND: i64 = 10;

/// Verbosity requested from a native provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    /// Events that are always logged.
    LogAlways = 0,
    /// Critical errors.
    Critical = 1,
    /// Errors.
    Error = 2,
    /// Warnings.
    Warning = 3,
    /// Informational events.
    #[default]
    Informational = 4,
    /// Everything, including very chatty events.
    Verbose = 5,
}

bitflags! {
    /// Event categories a runtime provider can be asked for.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct EventKeywords: u64 {
        /// Garbage collections and finalization.
        const GC = 0x1;
        /// GC handles being set or destroyed.
        const GC_HANDLE = 0x2;
        /// Module loads and unloads.
        const LOADER = 0x8;
        /// Just in time compilation.
        const JIT = 0x10;
        /// Lock contention (monitor enters that actually block).
        const CONTENTION = 0x4000;
        /// Exception processing.
        const EXCEPTIONS = 0x8000;
        /// Thread pool and other threading events.
        const THREADING = 0x10000;
        /// A reasonable compromise on verbosity.
        const DEFAULT = Self::GC.bits()
            | Self::LOADER.bits()
            | Self::JIT.bits()
            | Self::CONTENTION.bits()
            | Self::EXCEPTIONS.bits()
            | Self::THREADING.bits();
    }
}

/// Selects which native provider instances a listener subscribes to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderTarget {
    /// Match providers by name.
    Name(Cow<'static, str>),
    /// Match providers by identifier.
    Guid(Uuid),
}

impl ProviderTarget {
    /// The managed runtime provider.
    pub const fn runtime() -> Self {
        ProviderTarget::Name(Cow::Borrowed(RUNTIME_PROVIDER_NAME))
    }

    /// Returns `true` if a provider with the given name and identifier is
    /// selected by this target.
    pub fn matches(&self, name: &str, guid: Uuid) -> bool {
        match self {
            ProviderTarget::Name(target) => target.as_ref() == name,
            ProviderTarget::Guid(target) => *target == guid,
        }
    }
}

impl fmt::Display for ProviderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderTarget::Name(name) => f.write_str(name),
            ProviderTarget::Guid(guid) => write!(f, "{{{guid}}}"),
        }
    }
}

/// One positional payload value of a native event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    /// An unsigned integer.
    UInt(u64),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// A string.
    String(String),
}

impl PayloadValue {
    fn type_name(&self) -> &'static str {
        match self {
            PayloadValue::UInt(_) => "unsigned integer",
            PayloadValue::Int(_) => "signed integer",
            PayloadValue::Float(_) => "float",
            PayloadValue::Bool(_) => "bool",
            PayloadValue::String(_) => "string",
        }
    }

    /// Converts the value to an unsigned integer if it holds one, either
    /// directly or as a numeric string.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            PayloadValue::UInt(v) => Some(*v),
            PayloadValue::Int(v) => u64::try_from(*v).ok(),
            PayloadValue::Float(v) if v.fract() == 0.0 && *v >= 0.0 && *v <= u64::MAX as f64 => {
                Some(*v as u64)
            }
            PayloadValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Converts the value to a float if it holds a number, either directly or
    /// as a numeric string.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PayloadValue::UInt(v) => Some(*v as f64),
            PayloadValue::Int(v) => Some(*v as f64),
            PayloadValue::Float(v) => Some(*v),
            PayloadValue::String(s) => s.trim().parse().ok(),
            PayloadValue::Bool(_) => None,
        }
    }
}

macro_rules! impl_payload_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for PayloadValue {
                fn from(value: $ty) -> Self {
                    PayloadValue::$variant(value.into())
                }
            }
        )+
    };
}

impl_payload_from! {
    u8 => UInt,
    u16 => UInt,
    u32 => UInt,
    u64 => UInt,
    i32 => Int,
    i64 => Int,
    f32 => Float,
    f64 => Float,
    bool => Bool,
    String => String,
    &str => String,
}

/// Raised when a payload field is absent or cannot be converted.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    /// The event carries fewer payload values than expected.
    #[error("event `{event}` has no payload value at index {index}")]
    Missing {
        /// The event name.
        event: String,
        /// The requested payload index.
        index: usize,
    },
    /// The payload value cannot be converted to the requested type.
    #[error("payload value {index} of event `{event}` is a {found}, expected {expected}")]
    Mismatch {
        /// The event name.
        event: String,
        /// The requested payload index.
        index: usize,
        /// The requested type.
        expected: &'static str,
        /// The type found in the payload.
        found: &'static str,
    },
}

/// A native event notification, as handed over by a native provider.
///
/// The payload is positional and type erased; `payload_names` runs parallel
/// to `payload` and names every value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// The event name, including any version suffix (e.g. `GCStart_V2`).
    pub name: String,
    /// Timestamp of the event, in provider ticks.
    pub timestamp: i64,
    /// The positional payload values.
    #[serde(default)]
    pub payload: Vec<PayloadValue>,
    /// The payload field names, parallel to `payload`.
    #[serde(default)]
    pub payload_names: Vec<String>,
}

impl RawEvent {
    /// Creates an event without payload.
    pub fn new<N: Into<String>>(name: N, timestamp: i64) -> Self {
        RawEvent {
            name: name.into(),
            timestamp,
            ..Default::default()
        }
    }

    /// Appends a named payload value.
    pub fn with_field<N: Into<String>, V: Into<PayloadValue>>(mut self, name: N, value: V) -> Self {
        self.payload_names.push(name.into());
        self.payload.push(value.into());
        self
    }

    /// Returns `true` if the event name starts with `prefix`, ignoring ASCII
    /// case.
    pub fn name_starts_with(&self, prefix: &str) -> bool {
        self.name
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    }

    /// Looks up a payload value by its field name.
    pub fn field(&self, name: &str) -> Option<&PayloadValue> {
        self.payload_names
            .iter()
            .position(|n| n == name)
            .and_then(|idx| self.payload.get(idx))
    }

    fn value(&self, index: usize) -> Result<&PayloadValue, PayloadError> {
        self.payload.get(index).ok_or_else(|| PayloadError::Missing {
            event: self.name.clone(),
            index,
        })
    }

    fn mismatch(&self, index: usize, expected: &'static str, found: &PayloadValue) -> PayloadError {
        PayloadError::Mismatch {
            event: self.name.clone(),
            index,
            expected,
            found: found.type_name(),
        }
    }

    /// Reads payload value `index` as a `u32`.
    pub fn payload_u32(&self, index: usize) -> Result<u32, PayloadError> {
        let value = self.value(index)?;
        value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| self.mismatch(index, "u32", value))
    }

    /// Reads payload value `index` as a `u8`.
    pub fn payload_u8(&self, index: usize) -> Result<u8, PayloadError> {
        let value = self.value(index)?;
        value
            .as_u64()
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| self.mismatch(index, "u8", value))
    }

    /// Reads payload value `index` as an `f64`.
    pub fn payload_f64(&self, index: usize) -> Result<f64, PayloadError> {
        let value = self.value(index)?;
        value
            .as_f64()
            .ok_or_else(|| self.mismatch(index, "f64", value))
    }
}
