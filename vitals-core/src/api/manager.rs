use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use super::ApiResult;
use crate::client::MetricsAgentClient;
use crate::error::VitalsError;
use crate::models::{AgentDescriptor, AgentInfo, CpuMetricsResponse};
use crate::registry::AgentRegistry;
use crate::window::WireDuration;

#[derive(Clone)]
pub struct ManagerState {
    pub registry: Arc<AgentRegistry>,
    pub client: Arc<MetricsAgentClient>,
}

impl ManagerState {
    pub fn new(client: Arc<MetricsAgentClient>) -> Self {
        Self {
            registry: Arc::clone(client.registry()),
            client,
        }
    }
}

pub fn manager_router(state: ManagerState) -> Router {
    Router::new()
        .route("/api/cpu/get-all-by-id", get(get_cpu_metrics_by_agent))
        .route("/api/cpu/get-all", get(get_cpu_metrics_all_agents))
        .route("/api/agents/register", post(register_agent))
        .route("/api/agents/get-all", get(list_agents))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentWindowQuery {
    agent_id: i32,
    from_time: WireDuration,
    to_time: WireDuration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WindowQuery {
    from_time: WireDuration,
    to_time: WireDuration,
}

fn query_error(rejection: QueryRejection) -> VitalsError {
    VitalsError::validation(rejection.body_text())
}

async fn get_cpu_metrics_by_agent(
    State(state): State<ManagerState>,
    query: Result<Query<AgentWindowQuery>, QueryRejection>,
) -> ApiResult<Json<CpuMetricsResponse>> {
    let Query(query) = query.map_err(query_error)?;
    debug!(
        agent_id = query.agent_id,
        from = %query.from_time,
        to = %query.to_time,
        "Proxying CPU metrics request"
    );

    let response = state
        .client
        .get_cpu_metrics(query.agent_id, query.from_time, query.to_time)
        .await?;

    Ok(Json(response))
}

/// Reserved for cross-agent aggregation; answers an empty success once the
/// window parses.
async fn get_cpu_metrics_all_agents(
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(_window) = query.map_err(query_error)?;
    Ok(Json(json!({})))
}

async fn register_agent(
    State(state): State<ManagerState>,
    body: Result<Json<AgentInfo>, JsonRejection>,
) -> ApiResult<Json<AgentInfo>> {
    let Json(info) = body.map_err(|rejection| VitalsError::validation(rejection.body_text()))?;

    if !matches!(info.agent_address.scheme(), "http" | "https") || !info.agent_address.has_host() {
        return Err(VitalsError::validation(format!(
            "agentAddress must be an absolute http(s) URL, got '{}'",
            info.agent_address
        ))
        .into());
    }

    info!(agent_id = info.agent_id, "Registering agent");
    state
        .registry
        .register(AgentDescriptor::from(info.clone()))
        .await;

    Ok(Json(info))
}

async fn list_agents(State(state): State<ManagerState>) -> Json<Vec<AgentInfo>> {
    let agents = state.registry.list().await;
    Json(agents.into_iter().map(AgentInfo::from).collect())
}

async fn health(State(state): State<ManagerState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "role": "manager",
        "agents": state.registry.len().await,
    }))
}
