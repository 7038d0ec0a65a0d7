//! Unified API error handling
//!
//! Every handler returns [`AppResult`]; [`AppError`] maps each failure
//! class to a status code and a JSON body `{"error": ..., "detail": ...}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::broker::BrokerError;
use crate::erp::ErpError;
use crate::inventory::SyncError;
use crate::pipeline::PipelineError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad request payload or parameters (400)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Resource does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream (ERP or broker) rejected or failed the call (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Upstream currently unreachable, circuit open (503)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Anything else (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation", Some(msg.clone())),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Upstream(msg) => {
                error!(error = %msg, "upstream call failed");
                (StatusCode::BAD_GATEWAY, "upstream", Some(msg.clone()))
            }
            AppError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable", Some(msg.clone()))
            }
            AppError::Internal(msg) => {
                error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", None)
            }
        };

        let body = Json(ErrorBody {
            error: error.to_string(),
            detail,
        });
        (status, body).into_response()
    }
}

impl From<ErpError> for AppError {
    fn from(e: ErpError) -> Self {
        match e {
            ErpError::CircuitOpen => AppError::Unavailable(e.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<BrokerError> for AppError {
    fn from(e: BrokerError) -> Self {
        match e {
            BrokerError::CircuitOpen => AppError::Unavailable(e.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Erp(e) => e.into(),
            PipelineError::Broker(e) => e.into(),
        }
    }
}

impl From<SyncError> for AppError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Erp(e) => e.into(),
            SyncError::Broker(e) => e.into(),
        }
    }
}
