use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::MetricStore;
use crate::db::{Database, DatabaseError};
use crate::models::MetricSample;
use crate::window::{TimeWindow, WireDuration};

/// sqlite-backed CPU metric table.
///
/// sqlite tolerates a single writer at a time, so writes take the gate
/// exclusively while reads share it.
#[derive(Clone)]
pub struct CpuMetricsRepository {
    db: Database,
    gate: Arc<RwLock<()>>,
}

impl CpuMetricsRepository {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            gate: Arc::new(RwLock::new(())),
        }
    }

    pub async fn count(&self) -> Result<i64, DatabaseError> {
        self.db.ensure_ready()?;
        let _read = self.gate.read().await;

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cpu_metrics")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0)
    }
}

#[async_trait]
impl MetricStore for CpuMetricsRepository {
    async fn create(&self, sample: &MetricSample) -> Result<(), DatabaseError> {
        self.db.ensure_ready()?;
        let _write = self.gate.write().await;

        sqlx::query("INSERT INTO cpu_metrics (value, time) VALUES (?, ?)")
            .bind(sample.value)
            .bind(sample.time)
            .execute(self.db.pool())
            .await?;

        debug!(value = sample.value, time = sample.time, "CPU metric stored");
        Ok(())
    }

    async fn get_by_time_period(
        &self,
        from: WireDuration,
        to: WireDuration,
    ) -> Result<Vec<MetricSample>, DatabaseError> {
        self.db.ensure_ready()?;
        if TimeWindow::new(from, to).is_inverted() {
            return Ok(Vec::new());
        }
        let _read = self.gate.read().await;

        let records = sqlx::query_as::<_, MetricSample>(
            r#"
            SELECT value, time
            FROM cpu_metrics
            WHERE time >= ? AND time <= ?
            ORDER BY time ASC, id ASC
            "#,
        )
        .bind(from.as_secs())
        .bind(to.as_secs())
        .fetch_all(self.db.pool())
        .await?;

        Ok(records)
    }

    async fn get_all(&self) -> Result<Vec<MetricSample>, DatabaseError> {
        self.db.ensure_ready()?;
        let _read = self.gate.read().await;

        let records = sqlx::query_as::<_, MetricSample>(
            "SELECT value, time FROM cpu_metrics ORDER BY id ASC",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(records)
    }

    fn is_ready(&self) -> bool {
        self.db.is_ready()
    }
}
