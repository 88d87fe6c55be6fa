use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::{VitalsError, VitalsResult};
use crate::models::{AgentDescriptor, CpuMetricsResponse, GetCpuMetricsResponse};
use crate::registry::AgentRegistry;
use crate::retry::{retry_with_backoff, AttemptError, Delay, RetryConfig, RetryFailure, TokioDelay};
use crate::window::WireDuration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Manager-side client for the agent HTTP surface.
///
/// Requests are routed by agent id through the [`AgentRegistry`]; transport
/// failures, 5xx and 408 answers are retried with linear backoff, anything
/// else non-successful is returned to the caller on the first attempt.
pub struct MetricsAgentClient {
    http: Client,
    registry: Arc<AgentRegistry>,
    retry: RetryConfig,
    delay: Arc<dyn Delay>,
}

impl MetricsAgentClient {
    pub fn new(
        registry: Arc<AgentRegistry>,
        retry: RetryConfig,
        request_timeout: Duration,
    ) -> VitalsResult<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| VitalsError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            registry,
            retry,
            delay: Arc::new(TokioDelay),
        })
    }

    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Fetches one agent's CPU samples within `[from, to]`, stamped with the
    /// agent id.
    pub async fn get_cpu_metrics(
        &self,
        agent_id: i32,
        from: WireDuration,
        to: WireDuration,
    ) -> VitalsResult<CpuMetricsResponse> {
        let agent = self
            .registry
            .get(agent_id)
            .await
            .ok_or(VitalsError::AgentNotFound(agent_id))?;

        if !agent.enabled {
            return Err(VitalsError::AgentDisabled(agent_id));
        }

        let url = cpu_range_url(&agent, from, to)?;
        debug!(agent_id, url = %url, "Requesting CPU metrics from agent");

        let result = retry_with_backoff(
            "get_cpu_metrics",
            &self.retry,
            self.delay.as_ref(),
            |attempt| {
                let url = url.clone();
                async move {
                    debug!(agent_id, attempt, "Calling agent");
                    self.fetch(agent_id, url).await
                }
            },
        )
        .await;

        match result {
            Ok(response) => {
                info!(
                    agent_id,
                    samples = response.metrics.len(),
                    "Fetched CPU metrics from agent"
                );
                Ok(CpuMetricsResponse::from_agent(agent_id, response))
            }
            Err(RetryFailure::Permanent(e)) => Err(e),
            Err(RetryFailure::Exhausted {
                attempts,
                last_cause,
            }) => Err(VitalsError::UpstreamUnavailable {
                agent_id,
                attempts,
                cause: last_cause,
            }),
        }
    }

    async fn fetch(
        &self,
        agent_id: i32,
        url: Url,
    ) -> Result<GetCpuMetricsResponse, AttemptError<VitalsError>> {
        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AttemptError::Transient(describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(if is_transient_status(status) {
                AttemptError::Transient(format!("agent answered with status {}", status))
            } else {
                AttemptError::Permanent(VitalsError::UpstreamRejected {
                    agent_id,
                    status: status.as_u16(),
                })
            });
        }

        response.json::<GetCpuMetricsResponse>().await.map_err(|e| {
            AttemptError::Permanent(VitalsError::UpstreamMalformed {
                agent_id,
                cause: e.to_string(),
            })
        })
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        format!("transport error: {}", err)
    }
}

/// `{address}/api/metrics/cpu/from/{from}/to/{to}`, keeping any base path
/// the agent address carries.
fn cpu_range_url(agent: &AgentDescriptor, from: WireDuration, to: WireDuration) -> VitalsResult<Url> {
    let mut url = agent.address.clone();
    url.set_query(None);
    url.set_fragment(None);

    let from = from.to_string();
    let to = to.to_string();

    url.path_segments_mut()
        .map_err(|_| {
            VitalsError::Config(format!(
                "agent {} address '{}' cannot carry a path",
                agent.id, agent.address
            ))
        })?
        .pop_if_empty()
        .extend(["api", "metrics", "cpu", "from", from.as_str(), "to", to.as_str()]);

    Ok(url)
}
