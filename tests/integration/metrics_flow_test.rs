use chrono::Utc;
use serde_json::{json, Value};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vitals_core::{
    agent_router, manager_router, AgentRegistry, AgentState, CpuMetricsRepository, CpuSampler,
    Database, JobSchedule, ManagerState, MetricKind, MetricStore, MetricsAgentClient,
    MetricsScheduler, RetryConfig, TickOutcome, WireDuration,
};

struct Deployment {
    agent: String,
    manager: String,
    store: Arc<CpuMetricsRepository>,
    scheduler: MetricsScheduler,
    _dir: TempDir,
}

async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

async fn deploy(schedule: JobSchedule) -> Deployment {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("agent.db").display());
    let db = Database::connect_with_url(&url).await.unwrap();
    db.run_migrations().await.unwrap();

    let store = Arc::new(CpuMetricsRepository::new(db));
    let scheduler = MetricsScheduler::new(
        Arc::new(CpuSampler::new()),
        store.clone() as Arc<dyn MetricStore>,
        schedule,
    );
    let agent = serve(agent_router(AgentState::new(store.clone()))).await;

    let registry = Arc::new(AgentRegistry::new());
    let retry = RetryConfig {
        max_attempts: 3,
        backoff_step: Duration::from_millis(50),
        deadline: Duration::from_secs(10),
    };
    let client = MetricsAgentClient::new(registry, retry, Duration::from_secs(3)).unwrap();
    let manager = serve(manager_router(ManagerState::new(Arc::new(client)))).await;

    Deployment {
        agent,
        manager,
        store,
        scheduler,
        _dir: dir,
    }
}

async fn register(deployment: &Deployment, agent_id: i32) {
    let response = reqwest::Client::new()
        .post(format!("{}/api/agents/register", deployment.manager))
        .json(&json!({ "agentId": agent_id, "agentAddress": deployment.agent, "enable": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
}

fn every_second() -> JobSchedule {
    JobSchedule::every(MetricKind::Cpu, Duration::from_secs(1)).unwrap()
}

#[tokio::test]
async fn test_created_sample_is_visible_through_manager() {
    let deployment = deploy(every_second()).await;
    register(&deployment, 1).await;

    reqwest::Client::new()
        .post(format!("{}/api/metrics/cpu/create", deployment.agent))
        .json(&json!({ "value": 42, "time": "00.00:00:10" }))
        .send()
        .await
        .unwrap();

    let body: Value = reqwest::get(format!(
        "{}/api/cpu/get-all-by-id?agentId=1&fromTime=00.00:00:00&toTime=00.00:01:00",
        deployment.manager
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

    assert_eq!(
        body,
        json!({ "agentId": 1, "metrics": [{ "time": 10, "value": 42 }] })
    );
}

#[tokio::test]
async fn test_scheduled_samples_reach_the_manager() {
    let deployment = deploy(every_second()).await;
    register(&deployment, 1).await;

    let started = Utc::now().timestamp();
    deployment.scheduler.start().await;
    tokio::time::sleep(Duration::from_millis(2_600)).await;
    deployment.scheduler.stop().await;

    let stats = deployment.scheduler.stats();
    assert!(stats.recorded >= 2, "expected two ticks, got {:?}", stats);
    assert_eq!(
        deployment.store.get_all().await.unwrap().len() as u64,
        stats.recorded
    );

    let from = WireDuration::from_secs(started - 5).unwrap();
    let to = WireDuration::from_secs(Utc::now().timestamp() + 5).unwrap();
    let body: Value = reqwest::get(format!(
        "{}/api/cpu/get-all-by-id?agentId=1&fromTime={}&toTime={}",
        deployment.manager, from, to
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

    let metrics = body["metrics"].as_array().unwrap();
    assert_eq!(metrics.len() as u64, stats.recorded);
    for metric in metrics {
        let value = metric["value"].as_i64().unwrap();
        assert!((0..=100).contains(&value));
    }
}

#[tokio::test]
async fn test_query_command_prints_rows() {
    let deployment = deploy(every_second()).await;
    register(&deployment, 1).await;

    assert_eq!(deployment.scheduler.tick_once().await, TickOutcome::Recorded);
    let sample = deployment.store.get_all().await.unwrap()[0];

    let manager = deployment.manager.clone();
    let output = tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_vitals"))
            .args(["query", "--manager", &manager, "--agent-id", "1", "--last", "300"])
            .output()
            .expect("Failed to execute vitals command")
    })
    .await
    .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "query failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let expected = format!(
        "{} >>> {}",
        WireDuration::from_secs(sample.time).unwrap(),
        sample.value
    );
    assert!(stdout.contains(&expected), "missing row '{}' in:\n{}", expected, stdout);
    assert!(stdout.contains("Average load"));
}

#[tokio::test]
async fn test_query_command_json_output() {
    let deployment = deploy(every_second()).await;
    register(&deployment, 4).await;
    deployment.scheduler.tick_once().await;

    let manager = deployment.manager.clone();
    let output = tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_vitals"))
            .args([
                "query",
                "--manager",
                &manager,
                "--agent-id",
                "4",
                "--format",
                "json",
            ])
            .output()
            .expect("Failed to execute vitals command")
    })
    .await
    .unwrap();

    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["agentId"], 4);
    assert_eq!(body["metrics"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_command_updates_manager() {
    let deployment = deploy(every_second()).await;

    let manager = deployment.manager.clone();
    let agent = deployment.agent.clone();
    let output = tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_vitals"))
            .args([
                "register",
                "--manager",
                &manager,
                "--agent-id",
                "2",
                "--address",
                &agent,
                "--disabled",
            ])
            .output()
            .expect("Failed to execute vitals command")
    })
    .await
    .unwrap();
    assert!(output.status.success());

    let agents: Value = reqwest::get(format!("{}/api/agents/get-all", deployment.manager))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(agents[0]["agentId"], 2);
    assert_eq!(agents[0]["enable"], false);

    let response = reqwest::get(format!(
        "{}/api/cpu/get-all-by-id?agentId=2&fromTime=00.00:00:00&toTime=00.00:01:00",
        deployment.manager
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_health_endpoints() {
    let deployment = deploy(every_second()).await;
    register(&deployment, 1).await;

    let agent: Value = reqwest::get(format!("{}/api/health", deployment.agent))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(agent, json!({ "status": "ok", "role": "agent", "ready": true }));

    let manager: Value = reqwest::get(format!("{}/api/health", deployment.manager))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(manager, json!({ "status": "ok", "role": "manager", "agents": 1 }));
}
