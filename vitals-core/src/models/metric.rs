use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One stored CPU load reading.
///
/// `time` is an elapsed-seconds offset (the sampler uses seconds since the
/// Unix epoch) and is never negative. Samples are immutable once stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MetricSample {
    pub value: i32,
    pub time: i64,
}

impl MetricSample {
    pub fn new(value: i32, time: i64) -> Self {
        Self { value, time }
    }
}
