/**
 * DOMAIN LAYER - Error Handling
 *
 * AppError: every way the transaction engine can refuse to do its job
 *
 * Engine operations return typed errors; the HTTP mapping lives here and
 * nowhere else. "database error" tells you nothing - "INVALID_TRANSITION"
 * tells you exactly which rule was violated.
 */

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/**
 * AppError: the full failure taxonomy
 *
 * Validation / NotFound / Conflict map straight to 4xx.
 * Gateway failures are the remote side's fault - 502.
 * Integrity means the database surprised us - 500 plus an audit trail.
 */
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),                    // 404 - resource doesn't exist

    #[error("validation error: {0}")]
    Validation(String),                  // 400 - bad request data

    #[error("bad request: {0}")]
    BadRequest(String),                  // 400 - invalid request

    #[error("unauthorized")]
    Unauthorized,                        // 401 - missing or invalid identity

    #[error("conflict: {0}")]
    Conflict(String),                    // 409 - state conflict (oversold at completion, dup key)

    #[error("tier sold out")]
    SoldOut,                             // 409 - not enough inventory left

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },  // 409 - state machine says no

    #[error("retries exhausted")]
    RetryExhausted,                      // 400 - retry_count hit max_retries

    #[error("payment gateway failure: {0}")]
    GatewayFailure(String),              // 502 - gateway non-success or timeout

    #[error("gateway refund failed: {0}")]
    GatewayRefund(String),               // 502 - refund rejected by the gateway

    #[error("integrity violation: {0}")]
    Integrity(String),                   // 500 - uniqueness surprise after retries

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),       // 500 - database said no

    #[error("internal error: {0}")]
    Internal(String),                    // 500 - programmer error
}

// Standard error envelope: { status: "error", error: { code, message } }
#[derive(Serialize)]
struct ErrorBody {
    status: String,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) =>
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),

            AppError::Validation(msg) =>
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::BadRequest(msg) =>
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::RetryExhausted =>
                (StatusCode::BAD_REQUEST, "RETRY_EXHAUSTED", "Maximum retry attempts reached".to_string()),

            AppError::Unauthorized =>
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized".to_string()),

            AppError::Conflict(msg) =>
                (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::SoldOut =>
                (StatusCode::CONFLICT, "SOLD_OUT", "Not enough tickets available".to_string()),
            AppError::InvalidTransition { from, to } =>
                (StatusCode::CONFLICT, "INVALID_TRANSITION", format!("Cannot transition from {} to {}", from, to)),

            AppError::GatewayFailure(msg) => {
                tracing::warn!("gateway failure: {}", msg);
                (StatusCode::BAD_GATEWAY, "GATEWAY_FAILURE", msg.clone())
            }
            AppError::GatewayRefund(msg) => {
                tracing::warn!("gateway refund failure: {}", msg);
                (StatusCode::BAD_GATEWAY, "GATEWAY_REFUND_FAILED", msg.clone())
            }

            // 500s are unexpected - log the details, hide them from the caller
            AppError::Integrity(msg) => {
                tracing::error!("integrity violation: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTEGRITY_ERROR", "Internal server error".to_string())
            }
            AppError::Database(err) => {
                tracing::error!("database error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Internal server error".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Internal server error".to_string())
            }
        };

        let body = ErrorBody {
            status: "error".to_string(),
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
