use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use vitals_core::{
    agent_router, AgentState, CpuMetricsRepository, CpuSampler, Database, DatabaseConfig,
    MetricStore, MetricsScheduler, VitalsConfig,
};

use super::shutdown_signal;

/// Runs the agent until Ctrl-C: migrations, then the sampling schedule and
/// the HTTP surface side by side.
pub async fn run_agent(config: VitalsConfig, bind: Option<SocketAddr>) -> Result<()> {
    let bind = bind.unwrap_or(config.agent.bind);
    let schedule = config.agent.cpu_job()?;

    let db = Database::connect(&DatabaseConfig::from(&config.database))
        .await
        .context("failed to open the metric database")?;
    db.run_migrations().await?;

    let store: Arc<dyn MetricStore> = Arc::new(CpuMetricsRepository::new(db.clone()));
    let scheduler = MetricsScheduler::new(Arc::new(CpuSampler::new()), Arc::clone(&store), schedule)
        .with_shutdown_grace(config.agent.shutdown_grace());

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind agent on {}", bind))?;

    scheduler.start().await;

    println!(
        "{} Agent listening on {} (schedule: {})",
        "●".green(),
        bind.to_string().cyan(),
        scheduler.schedule().cron
    );
    info!(%bind, "Agent started");

    let app = agent_router(AgentState::new(store));
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    scheduler.stop().await;
    let stats = scheduler.stats();
    info!(
        recorded = stats.recorded,
        skipped = stats.skipped,
        store_failed = stats.store_failed,
        "Agent stopped"
    );
    db.close().await;

    served.context("agent server failed")
}
