use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::WorkflowError;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Machine-readable error code for workflow failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Below minimum repayment: {0}")]
    BelowMinimumRepayment(String),

    #[error("Exceeds outstanding balance: {0}")]
    ExceedsOutstandingBalance(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::BadRequest(rejection.body_text())
    }
}

impl From<WorkflowError> for ServiceError {
    fn from(err: WorkflowError) -> Self {
        let message = err.to_string();
        match err {
            WorkflowError::InvalidTransition { .. } | WorkflowError::StageMismatch { .. } => {
                ServiceError::InvalidTransition(message)
            }
            WorkflowError::InvalidAmount(_) => ServiceError::InvalidAmount(message),
            WorkflowError::BelowMinimumRepayment { .. } => {
                ServiceError::BelowMinimumRepayment(message)
            }
            WorkflowError::ExceedsOutstandingBalance { .. } => {
                ServiceError::ExceedsOutstandingBalance(message)
            }
            WorkflowError::MissingRejectionReason => ServiceError::ValidationError(message),
            WorkflowError::AdvanceNotEligible(_) => ServiceError::NotFound(message),
        }
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidTransition(_)
            | Self::InvalidAmount(_)
            | Self::BelowMinimumRepayment(_)
            | Self::ExceedsOutstandingBalance(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::ConcurrentModification(_) => StatusCode::CONFLICT,
            Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code for workflow rule violations
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidTransition(_) => Some("invalid_transition"),
            Self::InvalidAmount(_) => Some("invalid_amount"),
            Self::BelowMinimumRepayment(_) => Some("below_minimum_repayment"),
            Self::ExceedsOutstandingBalance(_) => Some("exceeds_outstanding_balance"),
            Self::ConcurrentModification(_) => Some("concurrent_modification"),
            Self::NotFound(_) => Some("not_found"),
            Self::ValidationError(_) => Some("validation_error"),
            Self::BadRequest(_) => Some("bad_request"),
            _ => None,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::Other(_) => "Internal server error".to_string(),
            Self::ConcurrentModification(id) => {
                format!("Record {} was modified by another request; reload and retry", id)
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            code: self.code().map(str::to_string),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
