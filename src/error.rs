use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Chain RPC error: {0}")]
    ChainRpc(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("No validators found")]
    NoValidators,

    #[error("Signing rejected: {0}")]
    Signing(String),

    #[error("Transaction submission failed: {0}")]
    Submission(String),

    #[error("Invalid settings: {0}")]
    Validation(String),

    #[error("A stake execution is already in flight")]
    ExecutionInProgress,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Network-class failures that the next tick retries naturally.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::ChainRpc(_) | AppError::Timeout(_) | AppError::NoValidators
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Persistence(err.to_string())
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_SETTINGS"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::ExecutionInProgress => (StatusCode::CONFLICT, "EXECUTION_IN_PROGRESS"),
            AppError::ChainRpc(_) | AppError::NoValidators => {
                (StatusCode::BAD_GATEWAY, "CHAIN_RPC_ERROR")
            }
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            AppError::Signing(_) | AppError::Submission(_) => {
                (StatusCode::BAD_GATEWAY, "WALLET_ERROR")
            }
            AppError::Redis(_) | AppError::Persistence(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
