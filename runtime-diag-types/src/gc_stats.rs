use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const LINE_PREFIX: &str = "GC: ";

/// Aggregated collection counters in the legacy `GC:` line format.
///
/// The line is `GC: <gen0> <gen1> <gen2> <allocated bytes> <total operations>`
/// and is only kept so that existing output can still be parsed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GcStats {
    /// Generation 0 collections.
    pub gen0_collections: u32,
    /// Generation 1 collections.
    pub gen1_collections: u32,
    /// Generation 2 collections.
    pub gen2_collections: u32,
    /// Bytes allocated.
    pub allocated_bytes: u64,
    /// Operations the counters were gathered over.
    pub total_operations: u64,
}

/// An error parsing a legacy `GC:` line.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GcStatsParseError {
    /// The line does not start with `GC: `.
    #[error("missing `GC: ` prefix")]
    MissingPrefix,
    /// The line does not carry exactly five fields.
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),
    /// A field is not an unsigned integer.
    #[error("invalid field {index}: `{value}`")]
    InvalidField {
        /// Zero based position of the field.
        index: usize,
        /// The raw field text.
        value: String,
    },
}

impl GcStats {
    /// Returns a copy with `operations` added to the operation count.
    pub fn with_total_operations(self, operations: u64) -> Self {
        self + GcStats {
            total_operations: operations,
            ..Default::default()
        }
    }

    /// Returns the number of collections of a generation. Generations above 2
    /// are counted as generation 2.
    pub fn collections_count(&self, generation: u32) -> u32 {
        match generation {
            0 => self.gen0_collections,
            1 => self.gen1_collections,
            _ => self.gen2_collections,
        }
    }

    /// Allocated bytes per operation, rounded half to even.
    pub fn bytes_allocated_per_operation(&self) -> u64 {
        if self.allocated_bytes == 0 || self.total_operations == 0 {
            return 0;
        }
        let per_op = self.allocated_bytes as f64 / self.total_operations as f64;
        round_half_even(per_op) as u64
    }
}

fn round_half_even(value: f64) -> f64 {
    let rounded = value.round();
    if (value - value.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded - value.signum()
    } else {
        rounded
    }
}

impl Add for GcStats {
    type Output = GcStats;

    fn add(self, rhs: GcStats) -> GcStats {
        GcStats {
            gen0_collections: self.gen0_collections.saturating_add(rhs.gen0_collections),
            gen1_collections: self.gen1_collections.saturating_add(rhs.gen1_collections),
            gen2_collections: self.gen2_collections.saturating_add(rhs.gen2_collections),
            allocated_bytes: self.allocated_bytes.saturating_add(rhs.allocated_bytes),
            total_operations: self.total_operations.saturating_add(rhs.total_operations),
        }
    }
}

impl Sub for GcStats {
    type Output = GcStats;

    fn sub(self, rhs: GcStats) -> GcStats {
        GcStats {
            gen0_collections: self.gen0_collections.saturating_sub(rhs.gen0_collections),
            gen1_collections: self.gen1_collections.saturating_sub(rhs.gen1_collections),
            gen2_collections: self.gen2_collections.saturating_sub(rhs.gen2_collections),
            allocated_bytes: self.allocated_bytes.saturating_sub(rhs.allocated_bytes),
            total_operations: self.total_operations.saturating_sub(rhs.total_operations),
        }
    }
}

impl fmt::Display for GcStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{LINE_PREFIX}{} {} {} {} {}",
            self.gen0_collections,
            self.gen1_collections,
            self.gen2_collections,
            self.allocated_bytes,
            self.total_operations
        )
    }
}

impl FromStr for GcStats {
    type Err = GcStatsParseError;

    fn from_str(line: &str) -> Result<GcStats, GcStatsParseError> {
        let rest = line
            .trim_end()
            .strip_prefix(LINE_PREFIX)
            .ok_or(GcStatsParseError::MissingPrefix)?;
        let fields: Vec<&str> = rest.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(GcStatsParseError::FieldCount(fields.len()));
        }

        let parse = |index: usize| -> Result<u64, GcStatsParseError> {
            fields[index]
                .parse()
                .map_err(|_| GcStatsParseError::InvalidField {
                    index,
                    value: fields[index].to_owned(),
                })
        };
        let parse_u32 = |index: usize| -> Result<u32, GcStatsParseError> {
            parse(index)?
                .try_into()
                .map_err(|_| GcStatsParseError::InvalidField {
                    index,
                    value: fields[index].to_owned(),
                })
        };

        Ok(GcStats {
            gen0_collections: parse_u32(0)?,
            gen1_collections: parse_u32(1)?,
            gen2_collections: parse_u32(2)?,
            allocated_bytes: parse(3)?,
            total_operations: parse(4)?,
        })
    }
}
