use std::hash::{Hash, Hasher};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::utils::hash_f64;

/// Periodic snapshot of process resource usage.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfoStatistics {
    /// When the snapshot was taken.
    pub timestamp: SystemTime,
    /// Process CPU usage across all cores, 0-100.
    pub cpu_percent: f64,
    /// Resident set size in bytes.
    pub working_set_bytes: u64,
    /// Memory private to this process in bytes.
    pub private_bytes: u64,
}

impl Hash for ProcessInfoStatistics {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.timestamp.hash(state);
        hash_f64(self.cpu_percent, state);
        self.working_set_bytes.hash(state);
        self.private_bytes.hash(state);
    }
}
