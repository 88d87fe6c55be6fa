use anyhow::{bail, Result};
use chrono::Utc;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use vitals_core::{CpuMetricDto, CpuMetricsResponse, TimeWindow, WireDuration};

use crate::manager_client::ManagerClient;

pub async fn cmd_query(manager: &str, agent_id: i32, last: i64, format: &str) -> Result<()> {
    if last < 0 {
        bail!("--last must not be negative");
    }

    let Some(now) = WireDuration::from_secs(Utc::now().timestamp()) else {
        bail!("system clock is before the Unix epoch");
    };
    let window = TimeWindow::ending_at(now, last);

    let client = ManagerClient::new(manager)?;
    let response = client.get_cpu_metrics(agent_id, window).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    print_response(&response, window);
    Ok(())
}

/// `dd.hh:mm:ss >>> value`
pub fn format_row(metric: &CpuMetricDto) -> String {
    let time = WireDuration::from_secs(metric.time)
        .map(|t| t.to_string())
        .unwrap_or_else(|| metric.time.to_string());
    format!("{} >>> {}", time, metric.value)
}

fn print_response(response: &CpuMetricsResponse, window: TimeWindow) {
    println!(
        "{} {}",
        "CPU load for agent".cyan().bold(),
        response.agent_id.to_string().yellow()
    );
    println!("Window: {} .. {}", window.from, window.to);
    println!("{}", "═".repeat(40).dimmed());

    if response.metrics.is_empty() {
        println!("{}", "No samples in this window.".yellow());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![Cell::new("Time >>> Load %").fg(comfy_table::Color::Cyan)]);

    for metric in &response.metrics {
        table.add_row(vec![Cell::new(format_row(metric))]);
    }

    println!("{}", table);
    println!();
    if let Some(average) = response.average_value() {
        println!("  Average load: {:.1}%", average);
    }
    println!("  Samples: {}", response.metrics.len());
}
