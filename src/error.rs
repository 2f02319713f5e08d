use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::SqlErr;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid product {0}")]
    InvalidProduct(Uuid),

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Seller is not eligible to receive orders")]
    SellerNotEligible,

    #[error("Insufficient wallet balance")]
    InsufficientBalance,

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        AppError::Conflict(reason.into())
    }

    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::PermissionDenied => "permission_denied",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Conflict(_) => "conflict",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidProduct(_) => "invalid_product",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::SellerNotEligible => "seller_not_eligible",
            AppError::InsufficientBalance => "insufficient_balance",
            AppError::Gateway(_) => "gateway_error",
            AppError::DbError(_) | AppError::OrmError(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Whether repeating the identical request may succeed.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            AppError::Gateway(_) | AppError::DbError(_) | AppError::OrmError(_)
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_)
            | AppError::InvalidProduct(_)
            | AppError::InsufficientStock { .. }
            | AppError::SellerNotEligible
            | AppError::InsufficientBalance => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// Unique violations from racing inserts surface as conflicts.
impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                tracing::debug!(%detail, "unique constraint violated");
                AppError::Conflict("Resource already exists".into())
            }
            _ => AppError::OrmError(err),
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    code: &'static str,
    retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
                code: self.code(),
                retryable: self.retryable(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_is_a_non_retryable_conflict() {
        let err = AppError::InsufficientStock {
            product_id: Uuid::nil(),
            requested: 3,
            available: 1,
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "insufficient_stock");
        assert!(!err.retryable());
    }

    #[test]
    fn gateway_failures_are_retryable() {
        let err = AppError::Gateway("timed out".into());
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.retryable());
    }

    #[test]
    fn database_errors_hide_details() {
        let err = AppError::from(sea_orm::DbErr::Custom("relation \"x\" missing".into()));
        assert_eq!(err.to_string(), "ORM error");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
