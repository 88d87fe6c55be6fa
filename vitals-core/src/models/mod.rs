mod agent;
mod dto;
mod metric;
mod schedule;

pub use agent::AgentDescriptor;
pub use dto::{
    AgentInfo, CpuMetricCreateRequest, CpuMetricDto, CpuMetricsResponse, GetCpuMetricsResponse,
};
pub use metric::MetricSample;
pub use schedule::{JobSchedule, MetricKind, DEFAULT_CPU_SCHEDULE};
