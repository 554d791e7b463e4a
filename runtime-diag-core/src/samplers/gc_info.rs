use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use runtime_diag_types::protocol::GcInfoStatistics;

use super::{GcHeapCapabilities, GcHeapProbe, Sample};
use crate::error::SamplingError;

const PROBE: &str = "gc heap";
const LARGE_OBJECT_HEAP: u32 = 3;

/// Samples [`GcInfoStatistics`] from a [`GcHeapProbe`].
///
/// The probe's optional counters are detected once, at construction. A tick
/// on a probe lacking them reports [`SamplingError::Unsupported`].
pub struct GcInfoSampler {
    probe: Arc<dyn GcHeapProbe>,
    capabilities: GcHeapCapabilities,
}

impl GcInfoSampler {
    /// Creates a sampler and detects what the probe supports.
    pub fn new(probe: Arc<dyn GcHeapProbe>) -> Self {
        let capabilities = probe.capabilities();
        diag_debug!("[GcInfoSampler] probe capabilities: {capabilities:?}");
        GcInfoSampler {
            probe,
            capabilities,
        }
    }

    /// The capabilities detected at construction.
    pub fn capabilities(&self) -> GcHeapCapabilities {
        self.capabilities
    }

    fn generation_size(&self, generation: u32) -> Result<u64, SamplingError> {
        if !self.capabilities.generation_sizes {
            return Err(SamplingError::Unsupported("generation sizes"));
        }
        self.probe
            .generation_size(generation)
            .map_err(|err| SamplingError::probe(PROBE, err))
    }

    fn collection_count(&self, generation: u32) -> Result<u32, SamplingError> {
        self.probe
            .collection_count(generation)
            .map_err(|err| SamplingError::probe(PROBE, err))
    }
}

impl Sample for GcInfoSampler {
    type Output = GcInfoStatistics;
    const NAME: &'static str = "gc info";

    fn sample(&mut self) -> Result<GcInfoStatistics, SamplingError> {
        let timestamp = SystemTime::now();
        let heap_size = self
            .probe
            .total_memory()
            .map_err(|err| SamplingError::probe(PROBE, err))?;
        let time_in_gc_percent = if self.capabilities.time_in_gc {
            self.probe
                .percent_time_in_gc()
                .map_err(|err| SamplingError::probe(PROBE, err))?
        } else {
            return Err(SamplingError::Unsupported("time in GC"));
        };

        Ok(GcInfoStatistics {
            timestamp,
            heap_size,
            gen0_count: self.collection_count(0)?,
            gen1_count: self.collection_count(1)?,
            gen2_count: self.collection_count(2)?,
            gen0_size: self.generation_size(0)?,
            gen1_size: self.generation_size(1)?,
            gen2_size: self.generation_size(2)?,
            loh_size: self.generation_size(LARGE_OBJECT_HEAP)?,
            time_in_gc_percent,
            gc_mode: self.probe.gc_mode(),
            latency_mode: self.probe.latency_mode(),
            compaction_mode: self.probe.compaction_mode(),
        })
    }
}

impl fmt::Debug for GcInfoSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcInfoSampler")
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::BoxError;
    use runtime_diag_types::protocol::GcMode;

    struct FullProbe {
        capability_checks: AtomicUsize,
    }

    impl GcHeapProbe for FullProbe {
        fn capabilities(&self) -> GcHeapCapabilities {
            self.capability_checks.fetch_add(1, Ordering::SeqCst);
            GcHeapCapabilities {
                generation_sizes: true,
                time_in_gc: true,
            }
        }
        fn total_memory(&self) -> Result<u64, BoxError> {
            Ok(4096)
        }
        fn collection_count(&self, generation: u32) -> Result<u32, BoxError> {
            Ok(10 - generation * 4)
        }
        fn generation_size(&self, generation: u32) -> Result<u64, BoxError> {
            Ok(1000 * u64::from(generation + 1))
        }
        fn percent_time_in_gc(&self) -> Result<u32, BoxError> {
            Ok(3)
        }
        fn gc_mode(&self) -> GcMode {
            GcMode::Server
        }
    }

    struct BasicProbe;

    impl GcHeapProbe for BasicProbe {
        fn total_memory(&self) -> Result<u64, BoxError> {
            Ok(1)
        }
        fn collection_count(&self, _generation: u32) -> Result<u32, BoxError> {
            Ok(0)
        }
    }

    #[test]
    fn test_full_snapshot() {
        let probe = Arc::new(FullProbe {
            capability_checks: AtomicUsize::new(0),
        });
        let mut sampler = GcInfoSampler::new(probe.clone());
        let first = sampler.sample().unwrap();
        sampler.sample().unwrap();

        assert_eq!(probe.capability_checks.load(Ordering::SeqCst), 1);
        assert_eq!(first.heap_size, 4096);
        assert_eq!(
            (first.gen0_count, first.gen1_count, first.gen2_count),
            (10, 6, 2)
        );
        assert_eq!(
            (first.gen0_size, first.gen1_size, first.gen2_size, first.loh_size),
            (1000, 2000, 3000, 4000)
        );
        assert_eq!(first.time_in_gc_percent, 3);
        assert_eq!(first.gc_mode, GcMode::Server);
    }

    #[test]
    fn test_missing_capability() {
        let mut sampler = GcInfoSampler::new(Arc::new(BasicProbe));
        assert_eq!(sampler.capabilities(), GcHeapCapabilities::default());
        assert!(matches!(
            sampler.sample(),
            Err(SamplingError::Unsupported("time in GC"))
        ));
    }
}
