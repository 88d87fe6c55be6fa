//! HTTP surfaces of the agent and the manager.

pub mod agent;
pub mod manager;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::VitalsError;

pub use agent::{agent_router, AgentState};
pub use manager::{manager_router, ManagerState};

/// A [`VitalsError`] on its way out of a request handler.
#[derive(Debug)]
pub struct ApiError(pub VitalsError);

impl<E> From<E> for ApiError
where
    E: Into<VitalsError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub fn status_for(err: &VitalsError) -> StatusCode {
    match err {
        VitalsError::Validation(_) => StatusCode::BAD_REQUEST,
        VitalsError::AgentNotFound(_) => StatusCode::NOT_FOUND,
        VitalsError::AgentDisabled(_) => StatusCode::CONFLICT,
        VitalsError::NotReady | VitalsError::SampleUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        VitalsError::UpstreamUnavailable { .. }
        | VitalsError::UpstreamRejected { .. }
        | VitalsError::UpstreamMalformed { .. } => StatusCode::BAD_GATEWAY,
        VitalsError::Storage(_) | VitalsError::Config(_) | VitalsError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0.log();
        let body = json!({
            "code": self.0.error_code(),
            "error": self.0.to_string(),
        });
        (status_for(&self.0), Json(body)).into_response()
    }
}
