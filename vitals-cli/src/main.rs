use clap::{Parser, Subcommand};
use colored::Colorize;
use std::net::SocketAddr;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vitals_core::{ConfigLoadError, Database, DatabaseConfig, LoggingConfig, VitalsConfig};

mod commands;
mod manager_client;

use commands::{cmd_query, cmd_register, run_agent, run_manager};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Parser)]
#[command(name = "vitals")]
#[command(version = VERSION)]
#[command(about = "Vitals - CPU load sampling agent and aggregating manager")]
#[command(long_about = r#"
Vitals samples host CPU load on a fixed schedule, keeps the samples in a local
SQLite file and serves them over HTTP (the agent). A manager keeps a registry
of agents and proxies time-window queries to them with bounded retries.

Use 'vitals agent' on every monitored host, 'vitals manager' once, then
'vitals register' and 'vitals query' against the manager.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the sampling agent (scheduler + HTTP API)")]
    Agent {
        #[arg(short, long, help = "Listen address, overrides agent.bind")]
        bind: Option<SocketAddr>,
    },

    #[command(about = "Run the manager (agent registry + query proxy)")]
    Manager {
        #[arg(short, long, help = "Listen address, overrides manager.bind")]
        bind: Option<SocketAddr>,
    },

    #[command(about = "Create the metric database and run migrations")]
    Init,

    #[command(about = "Query one agent's recent CPU load through the manager")]
    Query {
        #[arg(short, long, env = "VITALS_MANAGER_URL", default_value = "http://127.0.0.1:5159")]
        manager: String,

        #[arg(short, long)]
        agent_id: i32,

        #[arg(short, long, default_value_t = 60, help = "Window length in seconds")]
        last: i64,

        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "Register an agent with the manager")]
    Register {
        #[arg(short, long, env = "VITALS_MANAGER_URL", default_value = "http://127.0.0.1:5159")]
        manager: String,

        #[arg(short = 'i', long)]
        agent_id: i32,

        #[arg(short = 'a', long, help = "Agent base URL, e.g. http://10.0.0.5:39064")]
        address: String,

        #[arg(long)]
        disabled: bool,
    },

    #[command(about = "Show version information")]
    Version {
        #[arg(short, long)]
        detailed: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = VitalsConfig::load();

    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_logging(cli.verbose, &logging);

    match run(cli, config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, logging: &LoggingConfig) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&logging.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli, config: Result<VitalsConfig, ConfigLoadError>) -> anyhow::Result<()> {
    match cli.command {
        Commands::Agent { bind } => run_agent(config?, bind).await,
        Commands::Manager { bind } => run_manager(config?, bind).await,
        Commands::Init => cmd_init(config?).await,
        Commands::Query {
            manager,
            agent_id,
            last,
            format,
        } => cmd_query(&manager, agent_id, last, &format).await,
        Commands::Register {
            manager,
            agent_id,
            address,
            disabled,
        } => cmd_register(&manager, agent_id, &address, disabled).await,
        Commands::Version { detailed } => cmd_version(detailed),
    }
}

async fn cmd_init(config: VitalsConfig) -> anyhow::Result<()> {
    println!("{}", "Initializing Vitals agent storage...".cyan().bold());
    println!();
    println!("  {} Database URL: {}", "→".blue(), config.database_url());

    println!("  {} Connecting to database...", "→".blue());
    let db = Database::connect(&DatabaseConfig::from(&config.database)).await?;

    println!("  {} Running migrations...", "→".blue());
    db.run_migrations().await?;

    println!("  {} Verifying connection...", "→".blue());
    db.health_check().await?;

    db.close().await;

    println!();
    println!(
        "{} {}",
        "✓".green().bold(),
        "Database initialized successfully!".green()
    );

    Ok(())
}

fn cmd_version(detailed: bool) -> anyhow::Result<()> {
    if detailed {
        println!("{}", "Vitals Version Information".cyan().bold());
        println!("{}", "═".repeat(40).dimmed());
        println!("  {:<15} {}", "Version:".bold(), VERSION);
        println!("  {:<15} {}", "Name:".bold(), NAME);
        println!("  {:<15} Apache-2.0", "License:".bold());
        println!();
        println!("  {}", "Defaults:".bold());
        println!("    Agent bind:    127.0.0.1:39064");
        println!("    Manager bind:  127.0.0.1:5159");
        println!("    CPU schedule:  {}", vitals_core::DEFAULT_CPU_SCHEDULE);
        #[cfg(debug_assertions)]
        println!("    Build:         Debug");
        #[cfg(not(debug_assertions))]
        println!("    Build:         Release");
    } else {
        println!("vitals {}", VERSION);
    }

    Ok(())
}
