pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod repo;
pub mod retry;
pub mod window;

pub use api::{agent_router, manager_router, AgentState, ApiError, ManagerState};
pub use client::{MetricsAgentClient, DEFAULT_REQUEST_TIMEOUT};
pub use config::{
    get_config_dir, AgentConfig, ConfigLoadError,
    DatabaseConfig as VitalsDatabaseConfig, LoggingConfig, ManagerConfig, RetrySettings,
    VitalsConfig,
};
pub use db::{init_database, Database, DatabaseConfig, DatabaseError};
pub use error::{VitalsError, VitalsResult};
pub use metrics::{CpuSampler, MetricsScheduler, Sampler, TickOutcome, TickStats};
pub use models::{
    AgentDescriptor, AgentInfo, CpuMetricCreateRequest, CpuMetricDto, CpuMetricsResponse,
    GetCpuMetricsResponse, JobSchedule, MetricKind, MetricSample, DEFAULT_CPU_SCHEDULE,
};
pub use registry::AgentRegistry;
pub use repo::{CpuMetricsRepository, MetricStore};
pub use retry::{retry_with_backoff, AttemptError, Delay, RetryConfig, RetryFailure, TokioDelay};
pub use window::{TimeWindow, WireDuration};
