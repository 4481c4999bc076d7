//! Unified error handling for MobiPass
//!
//! This module provides a comprehensive error type that covers all possible
//! failure scenarios in the application, with automatic HTTP response mapping.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    // ==================== Cache Errors ====================
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Cache connection failed: {0}")]
    CacheConnection(String),

    // ==================== Pass Errors ====================
    #[error("Pass not found for rider: {0}")]
    PassNotFound(String),

    #[error("Pass {0} is suspended")]
    PassSuspended(String),

    #[error("Pass {0} is expired")]
    PassExpired(String),

    #[error("Insufficient balance: required {required} FCFA, available {available} FCFA")]
    InsufficientBalance { required: String, available: String },

    // ==================== Billing Errors ====================
    #[error("Debit failed: {0}")]
    DebitFailed(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    // ==================== Pricing Errors ====================
    #[error("Pricing unavailable: {0}")]
    PricingUnavailable(String),

    // ==================== Trip Errors ====================
    #[error("Trip not found: {0}")]
    TripNotFound(String),

    // ==================== Access Errors ====================
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: insufficient permissions")]
    Forbidden,

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ==================== Resource Errors ====================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Event publish failed: {0}")]
    EventPublish(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,

            // 402 Payment Required
            AppError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,

            // 403 Forbidden
            AppError::Forbidden | AppError::PassSuspended(_) | AppError::PassExpired(_) => {
                StatusCode::FORBIDDEN
            }

            // 404 Not Found
            AppError::PassNotFound(_)
            | AppError::TripNotFound(_)
            | AppError::TransactionNotFound(_)
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::Conflict(_) => StatusCode::CONFLICT,

            // 503 Service Unavailable
            AppError::PricingUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::Cache(_) => "cache_error",
            AppError::CacheConnection(_) => "cache_connection_error",
            AppError::PassNotFound(_) => "pass_not_found",
            AppError::PassSuspended(_) => "pass_suspended",
            AppError::PassExpired(_) => "pass_expired",
            AppError::InsufficientBalance { .. } => "insufficient_balance",
            AppError::DebitFailed(_) => "debit_failed",
            AppError::TransactionNotFound(_) => "transaction_not_found",
            AppError::PricingUnavailable(_) => "pricing_unavailable",
            AppError::TripNotFound(_) => "trip_not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
            AppError::EventPublish(_) => "event_publish_error",
        }
    }

    /// Whether the caller can retry after fixing their side
    /// (recharge for insufficient balance, renewal for expiry, etc.)
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::InsufficientBalance { .. }
                | AppError::PassSuspended(_)
                | AppError::PassExpired(_)
                | AppError::Validation(_)
                | AppError::InvalidInput(_)
        )
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::PassSuspended("SMP-123".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::PassNotFound("rider-1".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InsufficientBalance {
                required: "100.00".to_string(),
                available: "50.00".to_string()
            }
            .status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            AppError::DebitFailed("downstream".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::PassExpired("SMP-123".to_string()).error_code(),
            "pass_expired"
        );
        assert_eq!(
            AppError::PricingUnavailable("circuit open".to_string()).error_code(),
            "pricing_unavailable"
        );
    }

    #[test]
    fn test_user_recoverable() {
        assert!(AppError::InsufficientBalance {
            required: "100".to_string(),
            available: "50".to_string()
        }
        .is_user_recoverable());
        assert!(!AppError::DebitFailed("boom".to_string()).is_user_recoverable());
    }
}
