use anyhow::{Context, Result};
use colored::Colorize;
use url::Url;
use vitals_core::AgentInfo;

use crate::manager_client::ManagerClient;

pub async fn cmd_register(manager: &str, agent_id: i32, address: &str, disabled: bool) -> Result<()> {
    let agent_address =
        Url::parse(address).with_context(|| format!("invalid agent address '{}'", address))?;

    let info = AgentInfo {
        agent_id,
        agent_address,
        enable: !disabled,
    };

    ManagerClient::new(manager)?.register(&info).await?;

    println!(
        "{} Agent {} registered at {}{}",
        "✓".green().bold(),
        agent_id.to_string().yellow(),
        info.agent_address,
        if disabled { " (disabled)" } else { "" }
    );
    Ok(())
}
