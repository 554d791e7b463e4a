use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use runtime_diag_types::protocol::ProcessInfoStatistics;

use super::{ProcessProbe, Sample};
use crate::error::SamplingError;

/// Minimum wall time between two CPU usage refreshes.
pub const CPU_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Samples [`ProcessInfoStatistics`] from a [`ProcessProbe`].
///
/// CPU usage is derived from the growth of cumulative CPU time over wall
/// time. Short tick intervals give noisy ratios, so the value is only
/// refreshed once more than [`CPU_REFRESH_INTERVAL`] has passed and reused
/// in between.
pub struct ProcessInfoSampler {
    probe: Arc<dyn ProcessProbe>,
    processors: f64,
    last_refresh: Option<(Instant, Duration)>,
    cpu_percent: f64,
}

impl ProcessInfoSampler {
    /// Creates a sampler over `probe`.
    pub fn new(probe: Arc<dyn ProcessProbe>) -> Self {
        let processors = probe.processor_count().max(1) as f64;
        ProcessInfoSampler {
            probe,
            processors,
            last_refresh: None,
            cpu_percent: 0.0,
        }
    }

    /// Samples as if the wall clock read `now`.
    pub(crate) fn sample_at(&mut self, now: Instant) -> Result<ProcessInfoStatistics, SamplingError> {
        let timestamp = SystemTime::now();
        let snapshot = self
            .probe
            .snapshot()
            .map_err(|err| SamplingError::probe("process", err))?;

        match self.last_refresh {
            // the first sample only sets the baseline
            None => self.last_refresh = Some((now, snapshot.cpu_time)),
            Some((last_wall, last_cpu)) => {
                let wall = now.saturating_duration_since(last_wall);
                if wall > CPU_REFRESH_INTERVAL {
                    let cpu = snapshot.cpu_time.saturating_sub(last_cpu);
                    self.cpu_percent = cpu.as_secs_f64() * 100.0
                        / self.processors
                        / wall.as_secs_f64();
                    self.last_refresh = Some((now, snapshot.cpu_time));
                }
            }
        }

        Ok(ProcessInfoStatistics {
            timestamp,
            cpu_percent: self.cpu_percent,
            working_set_bytes: snapshot.working_set_bytes,
            private_bytes: snapshot.private_bytes,
        })
    }
}

impl Sample for ProcessInfoSampler {
    type Output = ProcessInfoStatistics;
    const NAME: &'static str = "process info";

    fn sample(&mut self) -> Result<ProcessInfoStatistics, SamplingError> {
        self.sample_at(Instant::now())
    }
}

impl fmt::Debug for ProcessInfoSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessInfoSampler")
            .field("processors", &self.processors)
            .field("cpu_percent", &self.cpu_percent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::BoxError;
    use crate::samplers::ProcessSnapshot;

    struct ScriptedProbe {
        cpu_times_ms: Mutex<Vec<u64>>,
    }

    impl ProcessProbe for ScriptedProbe {
        fn snapshot(&self) -> Result<ProcessSnapshot, BoxError> {
            let mut times = self.cpu_times_ms.lock().unwrap();
            if times.is_empty() {
                return Err("process is gone".into());
            }
            Ok(ProcessSnapshot {
                cpu_time: Duration::from_millis(times.remove(0)),
                working_set_bytes: 2048,
                private_bytes: 1024,
            })
        }

        fn processor_count(&self) -> usize {
            2
        }
    }

    #[test]
    fn test_cpu_smoothing() {
        let probe = ScriptedProbe {
            cpu_times_ms: Mutex::new(vec![100, 400, 1100, 1200]),
        };
        let mut sampler = ProcessInfoSampler::new(Arc::new(probe));
        let start = Instant::now();

        let first = sampler.sample_at(start).unwrap();
        assert_eq!(first.cpu_percent, 0.0);
        assert_eq!(first.working_set_bytes, 2048);
        assert_eq!(first.private_bytes, 1024);

        // half a second later the previous value is reused
        let second = sampler.sample_at(start + Duration::from_millis(500)).unwrap();
        assert_eq!(second.cpu_percent, 0.0);

        // 1000ms of CPU over 2 processors and 2000ms of wall time
        let third = sampler.sample_at(start + Duration::from_secs(2)).unwrap();
        assert!((third.cpu_percent - 25.0).abs() < 1e-9);

        let fourth = sampler.sample_at(start + Duration::from_millis(2500)).unwrap();
        assert!((fourth.cpu_percent - 25.0).abs() < 1e-9);

        let err = sampler.sample_at(start + Duration::from_secs(3)).unwrap_err();
        assert_eq!(err.to_string(), "process probe failed: process is gone");
    }
}
