use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::codes::ContentionFlag;
use crate::utils::hash_f64;

/// A single lock contention, reported when the waiting thread acquired the lock.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentionEventStatistics {
    /// Timestamp of the contention stop event, in provider ticks.
    pub timestamp: i64,
    /// Whether the lock was a managed or a native lock.
    pub flag: ContentionFlag,
    /// How long the thread waited for the lock, in nanoseconds.
    pub duration_ns: f64,
}

impl Hash for ContentionEventStatistics {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.timestamp.hash(state);
        self.flag.hash(state);
        hash_f64(self.duration_ns, state);
    }
}
