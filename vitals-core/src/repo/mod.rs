pub mod cpu_metrics_repo;

pub use cpu_metrics_repo::CpuMetricsRepository;

use crate::db::DatabaseError;
use crate::models::MetricSample;
use crate::window::WireDuration;
use async_trait::async_trait;

/// Append-only storage of timestamped samples.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Appends one sample. A failed write stores nothing.
    async fn create(&self, sample: &MetricSample) -> Result<(), DatabaseError>;

    /// Samples with `time` in the closed range `[from, to]`, ordered by time.
    /// An inverted range yields no samples.
    async fn get_by_time_period(
        &self,
        from: WireDuration,
        to: WireDuration,
    ) -> Result<Vec<MetricSample>, DatabaseError>;

    async fn get_all(&self) -> Result<Vec<MetricSample>, DatabaseError>;

    fn is_ready(&self) -> bool {
        true
    }
}
