use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

use super::ApiResult;
use crate::error::VitalsError;
use crate::models::{CpuMetricCreateRequest, GetCpuMetricsResponse, MetricSample};
use crate::repo::MetricStore;
use crate::window::WireDuration;

#[derive(Clone)]
pub struct AgentState {
    pub store: Arc<dyn MetricStore>,
}

impl AgentState {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }
}

pub fn agent_router(state: AgentState) -> Router {
    Router::new()
        .route("/api/metrics/cpu/create", post(create_cpu_metric))
        .route(
            "/api/metrics/cpu/from/{from_time}/to/{to_time}",
            get(get_cpu_metrics_by_time_period),
        )
        .route("/api/metrics/cpu/all", get(get_all_cpu_metrics))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn create_cpu_metric(
    State(state): State<AgentState>,
    body: Result<Json<CpuMetricCreateRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(request) = body.map_err(|rejection| VitalsError::validation(rejection.body_text()))?;
    let sample = MetricSample::from(request);

    state.store.create(&sample).await?;
    debug!(value = sample.value, time = sample.time, "CPU metric created");

    Ok(StatusCode::OK)
}

async fn get_cpu_metrics_by_time_period(
    State(state): State<AgentState>,
    Path((from_time, to_time)): Path<(String, String)>,
) -> ApiResult<Json<GetCpuMetricsResponse>> {
    let from: WireDuration = from_time.parse()?;
    let to: WireDuration = to_time.parse()?;

    let samples = state.store.get_by_time_period(from, to).await?;
    debug!(from = %from, to = %to, count = samples.len(), "CPU metrics read");

    Ok(Json(samples.into_iter().collect()))
}

async fn get_all_cpu_metrics(
    State(state): State<AgentState>,
) -> ApiResult<Json<GetCpuMetricsResponse>> {
    let samples = state.store.get_all().await?;
    Ok(Json(samples.into_iter().collect()))
}

async fn health(State(state): State<AgentState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "role": "agent",
        "ready": state.store.is_ready(),
    }))
}
