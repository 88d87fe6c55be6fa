use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use sysinfo::{CpuRefreshKind, RefreshKind, System};
use tokio::sync::RwLock;
use tracing::trace;

use crate::error::{VitalsError, VitalsResult};
use crate::models::{MetricKind, MetricSample};

/// One metric-acquisition routine.
#[async_trait]
pub trait Sampler: Send + Sync {
    fn kind(&self) -> MetricKind;

    /// Reads the host once. Transient read failures surface as
    /// [`VitalsError::SampleUnavailable`].
    async fn sample(&self) -> VitalsResult<MetricSample>;
}

pub struct CpuSampler {
    system: Arc<RwLock<System>>,
}

impl CpuSampler {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::everything()),
        );

        Self {
            system: Arc::new(RwLock::new(system)),
        }
    }

    pub async fn get_cpu_count(&self) -> usize {
        let system = self.system.read().await;
        system.cpus().len()
    }
}

#[async_trait]
impl Sampler for CpuSampler {
    fn kind(&self) -> MetricKind {
        MetricKind::Cpu
    }

    async fn sample(&self) -> VitalsResult<MetricSample> {
        let mut system = self.system.write().await;
        system.refresh_cpu_usage();

        if system.cpus().is_empty() {
            return Err(VitalsError::sample_unavailable(
                "host reported no CPUs",
            ));
        }

        let usage = system.global_cpu_usage();
        if !usage.is_finite() {
            return Err(VitalsError::sample_unavailable(format!(
                "host reported a non-finite CPU usage ({})",
                usage
            )));
        }

        let time = Utc::now().timestamp();
        if time < 0 {
            return Err(VitalsError::sample_unavailable(
                "system clock is before the Unix epoch",
            ));
        }

        let value = usage.round().clamp(0.0, 100.0) as i32;
        trace!(cpu_percent = value, time = time, "CPU sample collected");

        Ok(MetricSample::new(value, time))
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CpuSampler {
    fn clone(&self) -> Self {
        Self {
            system: Arc::clone(&self.system),
        }
    }
}
