//! Error types for retrieval, analysis and the HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors from the upstream block source
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(StatusCode),

    #[error("upstream returned malformed data: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("upstream reports no chain tip")]
    NotFound,
}

/// Errors raised while analyzing a block
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("malformed transaction {tx_hash}: {reason}")]
    MalformedBlock { tx_hash: String, reason: &'static str },

    #[error("block {block_hash}: total output exceeds decimal range")]
    TotalOverflow { block_hash: String },

    #[error("block time {time} is out of range")]
    InvalidBlockTime { time: i64 },
}

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("invalid threshold {0:?}: not a number")]
    NotNumeric(String),

    #[error("invalid threshold {0:?}: must not be negative")]
    Negative(String),

    #[error("invalid threshold {0:?}: too many significant digits")]
    OutOfRange(String),
}

/// Everything a handler can fail with
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Threshold(#[from] ThresholdError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Threshold(_) => StatusCode::BAD_REQUEST,
            ApiError::Retrieval(RetrievalError::NotFound) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Retrieval(_) | ApiError::Analysis(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // client errors echo their cause, server errors stay opaque
        let message = match &self {
            ApiError::Threshold(e) => e.to_string(),
            _ => {
                error!("Request failed: {}", self);
                "Error processing your request".to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
