//! Error handling for the Reseller Ledger platform
//!
//! Every failure is rendered as `{"error": {"code", "message", "field"}}` where
//! `code` is a stable error kind clients can branch on.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use shared::models::{InsufficientFunds, PaymentRejection, StockShortage};

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error(transparent)]
    InsufficientStock(#[from] StockShortage),

    #[error(transparent)]
    InsufficientBalance(#[from] InsufficientFunds),

    #[error("Payment amount {amount} exceeds remaining balance {remaining}")]
    AmountExceedsRemainingBalance { amount: Decimal, remaining: Decimal },

    #[error("{0} is already cancelled")]
    AlreadyCancelled(String),

    #[error("{0} is referenced by existing orders")]
    InUse(String),

    // Storage errors
    #[error("Concurrent modification of {0}")]
    ConcurrentModification(String),

    #[error("Store transaction timed out")]
    StoreTimeout,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a field-level validation failure
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Stable machine-readable error kind
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::Validation { .. } | AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::DuplicateEntry(_) => "DUPLICATE_ENTRY",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            AppError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            AppError::InsufficientBalance(_) => "INSUFFICIENT_BALANCE",
            AppError::AmountExceedsRemainingBalance { .. } => "AMOUNT_EXCEEDS_REMAINING_BALANCE",
            AppError::AlreadyCancelled(_) => "ALREADY_CANCELLED",
            AppError::InUse(_) => "RESOURCE_IN_USE",
            AppError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            AppError::StoreTimeout => "STORE_TIMEOUT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Internal(_) | AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::TokenExpired | AppError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Validation { .. } | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateEntry(_)
            | AppError::AlreadyCancelled(_)
            | AppError::InUse(_)
            | AppError::ConcurrentModification(_) => StatusCode::CONFLICT,
            AppError::InvalidStateTransition(_)
            | AppError::InsufficientStock(_)
            | AppError::InsufficientBalance(_)
            | AppError::AmountExceedsRemainingBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StoreTimeout => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(_) | AppError::Internal(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Failures a client may retry unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::StoreTimeout | AppError::ConcurrentModification(_)
        )
    }
}

impl From<PaymentRejection> for AppError {
    fn from(rejection: PaymentRejection) -> Self {
        match rejection {
            PaymentRejection::NonPositive => AppError::validation("amount", rejection.to_string()),
            PaymentRejection::ExceedsRemaining { amount, remaining } => {
                AppError::AmountExceedsRemainingBalance { amount, remaining }
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::ValidationError(errors.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            AppError::NotFound(resource) => format!("{} not found", resource),
            AppError::DuplicateEntry(field) => {
                format!("A record with this {} already exists", field)
            }
            // Infrastructure details stay in the logs
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::InternalError(_) => "An internal server error occurred".to_string(),
            AppError::StoreTimeout => {
                "The operation timed out and was not applied; retry later".to_string()
            }
            other => other.to_string(),
        };

        let field = match &self {
            AppError::Validation { field, .. } => Some(field.clone()),
            AppError::DuplicateEntry(field) => Some(field.clone()),
            AppError::AmountExceedsRemainingBalance { .. } => Some("amount".to_string()),
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!(code = self.code(), "Request rejected: {}", self);
        }

        let detail = ErrorDetail {
            code: self.code().to_string(),
            message,
            field,
            retryable: self.is_retryable(),
        };

        (status, Json(ErrorResponse { error: detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
