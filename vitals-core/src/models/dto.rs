//! Wire shapes for the agent and manager HTTP surfaces, with explicit
//! conversions to and from the domain records.

use serde::{Deserialize, Serialize};
use url::Url;

use super::{AgentDescriptor, MetricSample};
use crate::window::WireDuration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuMetricCreateRequest {
    pub value: i32,
    pub time: WireDuration,
}

impl From<CpuMetricCreateRequest> for MetricSample {
    fn from(request: CpuMetricCreateRequest) -> Self {
        MetricSample::new(request.value, request.time.as_secs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuMetricDto {
    pub time: i64,
    pub value: i32,
}

impl From<MetricSample> for CpuMetricDto {
    fn from(sample: MetricSample) -> Self {
        Self {
            time: sample.time,
            value: sample.value,
        }
    }
}

/// Agent response for range and full-history reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetCpuMetricsResponse {
    #[serde(default)]
    pub metrics: Vec<CpuMetricDto>,
}

impl FromIterator<MetricSample> for GetCpuMetricsResponse {
    fn from_iter<I: IntoIterator<Item = MetricSample>>(iter: I) -> Self {
        Self {
            metrics: iter.into_iter().map(CpuMetricDto::from).collect(),
        }
    }
}

/// Manager response: one agent's range read, stamped with the agent id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuMetricsResponse {
    pub agent_id: i32,
    #[serde(default)]
    pub metrics: Vec<CpuMetricDto>,
}

impl CpuMetricsResponse {
    pub fn from_agent(agent_id: i32, response: GetCpuMetricsResponse) -> Self {
        Self {
            agent_id,
            metrics: response.metrics,
        }
    }

    pub fn average_value(&self) -> Option<f64> {
        if self.metrics.is_empty() {
            return None;
        }
        let sum: i64 = self.metrics.iter().map(|m| m.value as i64).sum();
        Some(sum as f64 / self.metrics.len() as f64)
    }
}

/// Registration payload accepted by the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    pub agent_id: i32,
    pub agent_address: Url,
    #[serde(default = "default_enable")]
    pub enable: bool,
}

fn default_enable() -> bool {
    true
}

impl From<AgentInfo> for AgentDescriptor {
    fn from(info: AgentInfo) -> Self {
        Self {
            id: info.agent_id,
            address: info.agent_address,
            enabled: info.enable,
        }
    }
}

impl From<AgentDescriptor> for AgentInfo {
    fn from(descriptor: AgentDescriptor) -> Self {
        Self {
            agent_id: descriptor.id,
            agent_address: descriptor.address,
            enable: descriptor.enabled,
        }
    }
}
