use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{VitalsError, VitalsResult};

/// Quartz-style expression firing every five seconds.
pub const DEFAULT_CPU_SCHEDULE: &str = "0/5 * * ? * * *";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Cpu,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Cpu => write!(f, "cpu"),
        }
    }
}

/// A fixed recurring schedule for one metric kind.
///
/// Only the seconds-step form (`0/N` or `*/N` in the seconds field, every
/// other field `*` or `?`) is accepted, and `N` must divide a minute evenly so
/// the cadence stays fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSchedule {
    pub kind: MetricKind,
    pub cron: String,
    interval: Duration,
}

impl JobSchedule {
    pub fn parse(kind: MetricKind, cron: &str) -> VitalsResult<Self> {
        let invalid = |reason: &str| {
            VitalsError::Config(format!("unsupported schedule '{}': {}", cron, reason))
        };

        let fields: Vec<&str> = cron.split_whitespace().collect();
        if fields.len() != 6 && fields.len() != 7 {
            return Err(invalid("expected 6 or 7 fields"));
        }

        let step = match fields[0].split_once('/') {
            Some(("0" | "*", step)) => step
                .parse::<u64>()
                .map_err(|_| invalid("seconds step is not a number"))?,
            _ => return Err(invalid("seconds field must be 0/N or */N")),
        };

        check_step(step).map_err(|reason| invalid(reason))?;

        if fields[1..].iter().any(|f| *f != "*" && *f != "?") {
            return Err(invalid("only the seconds field may be restricted"));
        }

        Ok(Self {
            kind,
            cron: cron.to_string(),
            interval: Duration::from_secs(step),
        })
    }

    /// Builds the schedule that fires every `interval`, which must be a
    /// whole number of seconds dividing a minute.
    pub fn every(kind: MetricKind, interval: Duration) -> VitalsResult<Self> {
        let invalid = |reason: &str| {
            VitalsError::Config(format!("unsupported interval {:?}: {}", interval, reason))
        };

        if interval.subsec_nanos() != 0 {
            return Err(invalid("interval must be whole seconds"));
        }
        let step = interval.as_secs();
        check_step(step).map_err(|reason| invalid(reason))?;

        Ok(Self {
            kind,
            cron: format!("0/{} * * ? * * *", step),
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

fn check_step(step: u64) -> Result<(), &'static str> {
    if step == 0 || step >= 60 || 60 % step != 0 {
        return Err("seconds step must divide 60");
    }
    Ok(())
}
