pub mod agent;
pub mod manager;
pub mod query;
pub mod register;

pub use agent::run_agent;
pub use manager::run_manager;
pub use query::cmd_query;
pub use register::cmd_register;

use tracing::{info, warn};

pub(crate) async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
