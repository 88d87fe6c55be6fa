use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::db;
use crate::models::{AgentDescriptor, JobSchedule, MetricKind, DEFAULT_CPU_SCHEDULE};
use crate::retry::RetryConfig;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VitalsConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub agent: AgentConfig,
    pub manager: ManagerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_bind")]
    pub bind: SocketAddr,

    #[serde(default = "default_cpu_schedule")]
    pub cpu_schedule: String,

    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default = "default_manager_bind")]
    pub bind: SocketAddr,

    /// Agents seeded into the registry at startup.
    #[serde(default)]
    pub agents: Vec<AgentDescriptor>,

    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_step")]
    pub backoff_step_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,
}

fn default_database_url() -> String {
    db::DEFAULT_DATABASE_URL.to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_busy_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_agent_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 39064))
}

fn default_cpu_schedule() -> String {
    DEFAULT_CPU_SCHEDULE.to_string()
}

fn default_shutdown_grace() -> u64 {
    5
}

fn default_manager_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5159))
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_step() -> u64 {
    2
}

fn default_request_timeout() -> u64 {
    3
}

fn default_deadline() -> u64 {
    15
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bind: default_agent_bind(),
            cpu_schedule: default_cpu_schedule(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            bind: default_manager_bind(),
            agents: Vec::new(),
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_step_secs: default_backoff_step(),
            request_timeout_secs: default_request_timeout(),
            deadline_secs: default_deadline(),
        }
    }
}

impl From<&DatabaseConfig> for db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            acquire_timeout_secs: config.acquire_timeout_secs,
            busy_timeout_secs: config.busy_timeout_secs,
        }
    }
}

impl AgentConfig {
    pub fn cpu_job(&self) -> Result<JobSchedule, ConfigLoadError> {
        JobSchedule::parse(MetricKind::Cpu, &self.cpu_schedule).map_err(|e| {
            ConfigLoadError::InvalidValue {
                key: "agent.cpu_schedule".to_string(),
                message: e.to_string(),
            }
        })
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl RetrySettings {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            backoff_step: Duration::from_secs(self.backoff_step_secs),
            deadline: Duration::from_secs(self.deadline_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl VitalsConfig {
    pub fn load() -> Result<Self, ConfigLoadError> {
        Self::load_from_paths(get_config_paths())
    }

    pub fn load_from_paths(paths: Vec<PathBuf>) -> Result<Self, ConfigLoadError> {
        load_dotenv_files();

        let mut vitals_config = Self::from_sources(paths)?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            vitals_config.database.url = url;
        } else if let Ok(url) = std::env::var("VITALS_DATABASE_URL") {
            vitals_config.database.url = url;
        }

        if let Ok(level) = std::env::var("VITALS_LOG_LEVEL") {
            vitals_config.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            vitals_config.logging.level = level;
        }

        vitals_config.validate()?;

        Ok(vitals_config)
    }

    /// Files in order (later ones win), then `VITALS_*` variables such as
    /// `VITALS_AGENT__BIND` or `VITALS_MANAGER__RETRY__MAX_ATTEMPTS`.
    fn from_sources(paths: Vec<PathBuf>) -> Result<Self, ConfigLoadError> {
        let mut builder = ConfigBuilder::builder();

        for path in paths {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("VITALS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.database.url.is_empty() {
            return Err(ConfigLoadError::MissingRequired("database.url".to_string()));
        }

        if !self.database.url.starts_with("sqlite:") {
            return Err(ConfigLoadError::InvalidValue {
                key: "database.url".to_string(),
                message: "Must be a SQLite URL starting with sqlite:".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigLoadError::InvalidValue {
                key: "database.max_connections".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level_lower = self.logging.level.to_lowercase();
        if !valid_levels.contains(&level_lower.as_str()) && !level_lower.contains('=') {
            return Err(ConfigLoadError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Must be one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        self.agent.cpu_job()?;

        let retry = &self.manager.retry;
        if retry.max_attempts == 0 {
            return Err(ConfigLoadError::InvalidValue {
                key: "manager.retry.max_attempts".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if retry.request_timeout_secs == 0 {
            return Err(ConfigLoadError::InvalidValue {
                key: "manager.retry.request_timeout_secs".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if retry.deadline_secs < retry.request_timeout_secs {
            return Err(ConfigLoadError::InvalidValue {
                key: "manager.retry.deadline_secs".to_string(),
                message: "Cannot be shorter than request_timeout_secs".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for agent in &self.manager.agents {
            if !matches!(agent.address.scheme(), "http" | "https") {
                return Err(ConfigLoadError::InvalidValue {
                    key: "manager.agents".to_string(),
                    message: format!("agent {} address must be http(s)", agent.id),
                });
            }
            if !seen.insert(agent.id) {
                return Err(ConfigLoadError::InvalidValue {
                    key: "manager.agents".to_string(),
                    message: format!("agent id {} is listed twice", agent.id),
                });
            }
        }

        Ok(())
    }

    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    pub fn log_level(&self) -> &str {
        &self.logging.level
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("config").join("default.toml"));
        paths.push(cwd.join("config").join("local.toml"));
        paths.push(cwd.join("vitals.toml"));
    }

    if let Some(config_dir) = get_config_dir() {
        paths.push(config_dir.join("config.toml"));
    }

    paths
}

fn load_dotenv_files() {
    let mut env_paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        env_paths.push(cwd.join(".env"));
        env_paths.push(cwd.join(".env.local"));
    }

    if let Some(config_dir) = get_config_dir() {
        env_paths.push(config_dir.join(".env"));
    }

    for path in env_paths {
        if path.exists() {
            let _ = dotenvy::from_path(&path);
        }
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vitals"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use url::Url;

    #[test]
    fn test_default_config() {
        let config = VitalsConfig::default();

        assert_eq!(config.database.url, "sqlite://vitals-agent.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert_eq!(config.agent.bind.port(), 39064);
        assert_eq!(config.agent.cpu_schedule, "0/5 * * ? * * *");
        assert_eq!(config.agent.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(config.manager.bind.port(), 5159);
        assert!(config.manager.agents.is_empty());
        assert_eq!(config.manager.retry.max_attempts, 3);
        assert_eq!(config.manager.retry.request_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(VitalsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_non_sqlite_url() {
        let mut config = VitalsConfig::default();
        config.database.url = "postgres://localhost/vitals".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigLoadError::InvalidValue { .. })
        ));

        config.database.url = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigLoadError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_validation_zero_pool() {
        let mut config = VitalsConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_log_levels() {
        let mut config = VitalsConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "vitals_core=debug,sqlx=warn".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_bad_schedule() {
        let mut config = VitalsConfig::default();
        config.agent.cpu_schedule = "0 0 12 * * ?".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_retry_settings() {
        let mut config = VitalsConfig::default();
        config.manager.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = VitalsConfig::default();
        config.manager.retry.deadline_secs = 2;
        config.manager.retry.request_timeout_secs = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_duplicate_agent_ids() {
        let mut config = VitalsConfig::default();
        let address = Url::parse("http://localhost:39064/").unwrap();
        config.manager.agents = vec![
            AgentDescriptor::new(1, address.clone()),
            AgentDescriptor::new(1, address),
        ];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_settings_conversion() {
        let retry = RetrySettings::default().retry_config();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.backoff_step, Duration::from_secs(2));
        assert_eq!(retry.deadline, Duration::from_secs(15));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vitals.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[database]
url = "sqlite://metrics.db"

[agent]
bind = "0.0.0.0:40000"
cpu_schedule = "*/10 * * * * ?"

[manager.retry]
max_attempts = 5

[[manager.agents]]
id = 1
address = "http://10.0.0.1:39064/"

[[manager.agents]]
id = 2
address = "http://10.0.0.2:39064/"
enabled = false
"#
        )
        .unwrap();

        let config = VitalsConfig::from_sources(vec![path]).unwrap();
        assert_eq!(config.database.url, "sqlite://metrics.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.agent.bind.port(), 40000);
        assert_eq!(
            config.agent.cpu_job().unwrap().interval(),
            Duration::from_secs(10)
        );
        assert_eq!(config.manager.retry.max_attempts, 5);
        assert_eq!(config.manager.retry.deadline_secs, 15);
        assert_eq!(config.manager.agents.len(), 2);
        assert!(config.manager.agents[0].enabled);
        assert!(!config.manager.agents[1].enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_config_conversion() {
        let config = VitalsConfig::default();
        let db_config = db::DatabaseConfig::from(&config.database);
        assert_eq!(db_config.url, config.database.url);
        assert_eq!(db_config.busy_timeout_secs, 5);
    }

    #[test]
    fn test_config_dir() {
        if let Some(dir) = get_config_dir() {
            assert!(dir.ends_with("vitals"));
        }
    }
}
