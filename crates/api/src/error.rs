//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orchestrator::OrchestratorError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order creation error.
    Orchestrator(OrchestratorError),
    /// Store error outside the orchestrator.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Orchestrator(err) => orchestrator_error_to_response(err),
            ApiError::Store(err) => {
                tracing::error!(error = %err, "store error");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn orchestrator_error_to_response(err: OrchestratorError) -> (StatusCode, String) {
    match &err {
        // The user-facing creation-time failure: stock ran out first.
        OrchestratorError::InsufficientInventory { .. } => {
            (StatusCode::CONFLICT, err.to_string())
        }
        OrchestratorError::NoItems
        | OrchestratorError::InvalidQuantity { .. }
        | OrchestratorError::InvalidPrice { .. }
        | OrchestratorError::DuplicateProduct { .. }
        | OrchestratorError::TotalMismatch { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        OrchestratorError::Store(_) | OrchestratorError::Queue(_) => {
            tracing::error!(error = %err, "order creation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        ApiError::Orchestrator(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
