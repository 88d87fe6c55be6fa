use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use vitals_core::{manager_router, AgentRegistry, ManagerState, MetricsAgentClient, VitalsConfig};

use super::shutdown_signal;

pub async fn run_manager(config: VitalsConfig, bind: Option<SocketAddr>) -> Result<()> {
    let bind = bind.unwrap_or(config.manager.bind);

    let registry = Arc::new(AgentRegistry::with_agents(config.manager.agents.clone()).await);
    let client = MetricsAgentClient::new(
        Arc::clone(&registry),
        config.manager.retry.retry_config(),
        config.manager.retry.request_timeout(),
    )?;

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind manager on {}", bind))?;

    println!(
        "{} Manager listening on {} ({} agent(s) preconfigured)",
        "●".green(),
        bind.to_string().cyan(),
        registry.len().await
    );
    info!(%bind, "Manager started");

    let app = manager_router(ManagerState::new(Arc::new(client)));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("manager server failed")?;

    info!("Manager stopped");
    Ok(())
}
