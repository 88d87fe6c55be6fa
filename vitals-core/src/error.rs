//! Error types for the Vitals core library.
//!
//! Every failure surfaced by the agent or the manager is a [`VitalsError`].
//! Background failures (sampling, scheduled ticks) are logged and swallowed;
//! request-path failures propagate to the caller and map onto HTTP statuses.
//!
//! # Error Codes Reference
//!
//! | Code Range | Category | Description |
//! |------------|----------|-------------|
//! | E1001-E1099 | Storage | Metric store I/O and readiness errors |
//! | E2001-E2099 | Config | Configuration loading and validation errors |
//! | E3001-E3099 | Agent | Agent registry lookups |
//! | E4001-E4099 | Upstream | Manager to agent calls |
//! | E5001-E5099 | Sampling | Host metric acquisition errors |
//! | E9001-E9099 | General | Validation and internal errors |

use thiserror::Error;
use tracing::{error, warn};

use crate::config::ConfigLoadError;
use crate::db::DatabaseError;

#[derive(Debug, Error)]
pub enum VitalsError {
    // ========================================================================
    // Storage Errors (E1001-E1099)
    // ========================================================================
    /// Underlying storage failed (disk full, lock timeout, constraint violation)
    #[error("[E1001] Storage operation failed: {0}")]
    Storage(String),

    /// Schema migrations have not completed yet
    #[error("[E1002] Metric store is not ready: migrations have not completed")]
    NotReady,

    // ========================================================================
    // Configuration Errors (E2001-E2099)
    // ========================================================================
    #[error("[E2001] Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Agent Errors (E3001-E3099)
    // ========================================================================
    #[error("[E3001] Agent not found: {0}")]
    AgentNotFound(i32),

    #[error("[E3002] Agent {0} is disabled")]
    AgentDisabled(i32),

    // ========================================================================
    // Upstream Errors (E4001-E4099)
    // ========================================================================
    /// The agent could not be reached after every retry was spent
    #[error("[E4001] Agent {agent_id} unavailable after {attempts} attempt(s): {cause}")]
    UpstreamUnavailable {
        agent_id: i32,
        attempts: u32,
        cause: String,
    },

    /// The agent answered with a non-transient failure status
    #[error("[E4002] Agent {agent_id} rejected the request with status {status}")]
    UpstreamRejected { agent_id: i32, status: u16 },

    /// The agent answered successfully but its body could not be decoded
    #[error("[E4003] Agent {agent_id} returned a malformed response: {cause}")]
    UpstreamMalformed { agent_id: i32, cause: String },

    // ========================================================================
    // Sampling Errors (E5001-E5099)
    // ========================================================================
    #[error("[E5001] Sample unavailable: {0}")]
    SampleUnavailable(String),

    // ========================================================================
    // General Errors (E9001-E9099)
    // ========================================================================
    #[error("[E9001] Validation failed: {0}")]
    Validation(String),

    #[error("[E9002] Internal error: {0}")]
    Internal(String),
}

pub type VitalsResult<T> = Result<T, VitalsError>;

impl VitalsError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn sample_unavailable(message: impl Into<String>) -> Self {
        Self::SampleUnavailable(message.into())
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Storage(_) => "E1001",
            Self::NotReady => "E1002",
            Self::Config(_) => "E2001",
            Self::AgentNotFound(_) => "E3001",
            Self::AgentDisabled(_) => "E3002",
            Self::UpstreamUnavailable { .. } => "E4001",
            Self::UpstreamRejected { .. } => "E4002",
            Self::UpstreamMalformed { .. } => "E4003",
            Self::SampleUnavailable(_) => "E5001",
            Self::Validation(_) => "E9001",
            Self::Internal(_) => "E9002",
        }
    }

    /// Whether a caller may reasonably retry the same request later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NotReady | Self::UpstreamUnavailable { .. } | Self::SampleUnavailable(_)
        )
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::AgentNotFound(_) | Self::AgentDisabled(_)
        )
    }

    /// Log this error with appropriate severity level.
    pub fn log(&self) {
        let code = self.error_code();

        if self.is_transient() || self.is_client_error() {
            warn!(error_code = %code, "{}", self);
        } else {
            error!(error_code = %code, "{}", self);
        }
    }
}

impl From<DatabaseError> for VitalsError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotReady => VitalsError::NotReady,
            DatabaseError::InvalidConfig(message) => VitalsError::Config(message),
            other => VitalsError::Storage(other.to_string()),
        }
    }
}

impl From<ConfigLoadError> for VitalsError {
    fn from(err: ConfigLoadError) -> Self {
        VitalsError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for VitalsError {
    fn from(err: serde_json::Error) -> Self {
        VitalsError::Internal(format!("serialization failed: {}", err))
    }
}
