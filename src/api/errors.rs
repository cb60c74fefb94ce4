//! # Application errors
//!
//! Every handler returns [`AppResult`]. The [`AppError`] variants map onto
//! the HTTP status codes of the API and log themselves when rendered.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::error::Error;
use thiserror::Error;

use crate::auth::policy::Rejection;
use crate::auth::token::TokenError;

/// Error taxonomy exposed to API clients
#[derive(Error, Debug)]
pub enum AppError {
    /// Storage failure, with the operation that triggered it
    #[error("Database error in operation '{operation}': {source}")]
    Database {
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Validation error in field '{field}': {message}")]
    ValidationWithField {
        field: String,
        message: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing, invalid or expired credential
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated, but the role or ownership does not allow the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {resource_type} with ID '{id}'")]
    NotFoundWithId {
        resource_type: String,
        id: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error (trace: {trace_id}): {message}")]
    InternalWithTrace {
        trace_id: String,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wraps a storage error with the operation name. Unique-constraint
    /// violations become `Conflict`.
    pub fn database(operation: &str, source: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &source {
            if db_error.is_unique_violation() {
                return Self::Conflict(format!("Duplicate value rejected by '{}'", operation));
            }
        }
        Self::Database {
            operation: operation.to_string(),
            source,
        }
    }

    pub fn validation_field(field: &str, message: &str) -> Self {
        Self::ValidationWithField {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn not_found_id(resource_type: &str, id: impl ToString) -> Self {
        Self::NotFoundWithId {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }

    /// Internal error tagged with a trace id that is echoed to the client
    pub fn internal_trace(message: &str, trace_id: Option<String>) -> Self {
        Self::InternalWithTrace {
            trace_id: trace_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            message: message.to_string(),
        }
    }

    fn category(&self) -> &'static str {
        match self {
            Self::Database { .. } => "Database error",
            Self::ValidationWithField { .. } | Self::Validation(_) => "Validation error",
            Self::Unauthenticated(_) => "Not authenticated",
            Self::Forbidden(_) => "Forbidden",
            Self::NotFoundWithId { .. } => "Not found",
            Self::Conflict(_) => "Conflict",
            Self::InternalWithTrace { .. } | Self::Internal(_) => "Internal error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationWithField { .. } | Self::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFoundWithId { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database { .. } | Self::InternalWithTrace { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Self::Database { operation, source } => {
                tracing::error!(
                    operation = %operation,
                    error = %source,
                    error_chain = ?source.source(),
                    "Database error occurred"
                );
                "Internal server error".to_string()
            }
            Self::ValidationWithField { field, message } => {
                tracing::warn!(field = %field, message = %message, "Validation error");
                format!("Field '{}': {}", field, message)
            }
            Self::Unauthenticated(reason) => {
                tracing::warn!(reason = %reason, "Unauthenticated request");
                reason.clone()
            }
            Self::Forbidden(reason) => {
                tracing::warn!(reason = %reason, "Forbidden request");
                reason.clone()
            }
            Self::NotFoundWithId { resource_type, id } => {
                tracing::info!(resource_type = %resource_type, id = %id, "Resource not found");
                format!("{} with ID '{}' not found", resource_type, id)
            }
            Self::InternalWithTrace { trace_id, message } => {
                tracing::error!(trace_id = %trace_id, message = %message, "Internal error with trace");
                format!("Internal error (trace: {})", trace_id)
            }
            Self::Internal(message) => {
                tracing::error!(message = %message, "Internal error");
                "Internal server error".to_string()
            }
            Self::Validation(message) | Self::Conflict(message) => {
                tracing::info!(status = %self.status_code(), message = %message, "Request rejected");
                message.clone()
            }
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.category().to_string(),
            message,
        })
    }
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

pub type AppResult<T> = Result<T, AppError>;

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        Self::database("database_operation", error)
    }
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Unauthenticated => Self::Unauthenticated(rejection.to_string()),
            Rejection::Forbidden => Self::Forbidden(rejection.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::InvalidCredential(_) => Self::Unauthenticated("Invalid token".to_string()),
            TokenError::Issue(e) => Self::internal_trace(&format!("Token issuance failed: {}", e), None),
        }
    }
}

pub trait ResultExt<T> {
    fn map_err_internal(self, message: &str) -> AppResult<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + 'static,
{
    fn map_err_internal(self, message: &str) -> AppResult<T> {
        self.map_err(|e| AppError::internal_trace(&format!("{}: {}", message, e), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(AppError::Unauthenticated("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found_id("Menu item", 3).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::validation_field("status", "bad").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Database { operation: "op".into(), source: sqlx::Error::RowNotFound }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rejections_convert_to_auth_errors() {
        assert!(matches!(AppError::from(Rejection::Unauthenticated), AppError::Unauthenticated(_)));
        assert!(matches!(AppError::from(Rejection::Forbidden), AppError::Forbidden(_)));
    }

    #[test]
    fn database_errors_are_not_leaked() {
        let err = AppError::database("list_menu_items", sqlx::Error::PoolTimedOut);
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
