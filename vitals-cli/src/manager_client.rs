use anyhow::{bail, Context, Result};
use reqwest::Client;
use std::time::Duration;
use url::Url;
use vitals_core::{AgentInfo, CpuMetricsResponse, TimeWindow};

/// Thin HTTP client for the manager's public endpoints.
pub struct ManagerClient {
    http: Client,
    base: Url,
}

impl ManagerClient {
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid manager URL '{}'", base))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { http, base })
    }

    /// Appends `segments` to the base path, so a manager mounted under a
    /// prefix keeps it.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("manager URL '{}' cannot carry a path", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn register(&self, info: &AgentInfo) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint(&["api", "agents", "register"])?)
            .json(info)
            .send()
            .await
            .context("manager is unreachable")?;

        if !response.status().is_success() {
            bail!(
                "manager rejected registration ({}): {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }
        Ok(())
    }

    pub async fn get_cpu_metrics(
        &self,
        agent_id: i32,
        window: TimeWindow,
    ) -> Result<CpuMetricsResponse> {
        let mut url = self.endpoint(&["api", "cpu", "get-all-by-id"])?;
        url.query_pairs_mut()
            .append_pair("agentId", &agent_id.to_string())
            .append_pair("fromTime", &window.from.to_string())
            .append_pair("toTime", &window.to.to_string());

        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("manager is unreachable")?;

        if !response.status().is_success() {
            bail!(
                "manager answered {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        response
            .json::<CpuMetricsResponse>()
            .await
            .context("manager returned an unreadable body")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vitals_core::WireDuration;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_cpu_metrics_sends_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cpu/get-all-by-id"))
            .and(query_param("agentId", "1"))
            .and(query_param("fromTime", "00.00:00:00"))
            .and(query_param("toTime", "00.00:01:00"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "agentId": 1,
                "metrics": [{ "time": 30, "value": 12 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ManagerClient::new(&server.uri()).unwrap();
        let window = TimeWindow::new(WireDuration::ZERO, WireDuration::from_secs(60).unwrap());
        let response = client.get_cpu_metrics(1, window).await.unwrap();

        assert_eq!(response.agent_id, 1);
        assert_eq!(response.metrics[0].value, 12);
    }

    #[tokio::test]
    async fn test_register_posts_agent_info() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/agents/register"))
            .and(body_json(json!({
                "agentId": 1,
                "agentAddress": "http://localhost:39064/",
                "enable": true
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = ManagerClient::new(&server.uri()).unwrap();
        let info = AgentInfo {
            agent_id: 1,
            agent_address: Url::parse("http://localhost:39064").unwrap(),
            enable: true,
        };
        client.register(&info).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("unknown agent"))
            .mount(&server)
            .await;

        let client = ManagerClient::new(&server.uri()).unwrap();
        let window = TimeWindow::new(WireDuration::ZERO, WireDuration::ZERO);
        let err = client.get_cpu_metrics(7, window).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_base_path_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metrics/api/cpu/get-all-by-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "agentId": 3,
                "metrics": []
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/metrics/api/agents/register"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        for base in [
            format!("{}/metrics", server.uri()),
            format!("{}/metrics/", server.uri()),
        ] {
            let client = ManagerClient::new(&base).unwrap();
            assert_eq!(
                client.endpoint(&["api", "cpu", "get-all-by-id"]).unwrap().path(),
                "/metrics/api/cpu/get-all-by-id"
            );
        }

        let client = ManagerClient::new(&format!("{}/metrics/", server.uri())).unwrap();
        let window = TimeWindow::new(WireDuration::ZERO, WireDuration::ZERO);
        let response = client.get_cpu_metrics(3, window).await.unwrap();
        assert_eq!(response.agent_id, 3);

        let info = AgentInfo {
            agent_id: 3,
            agent_address: Url::parse("http://localhost:39064").unwrap(),
            enable: true,
        };
        client.register(&info).await.unwrap();
    }

    #[test]
    fn test_rejects_invalid_base() {
        assert!(ManagerClient::new("not a url").is_err());
    }
}
