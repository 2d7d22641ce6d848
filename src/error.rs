//! Error types and handling for the job board backend

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

/// Custom error types for the application
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No session, or the session could not be resolved
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Role or ownership predicate failed
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// Not found errors
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Resource is not in a state that allows the requested transition
    #[error("{0}")]
    InvalidState(String),

    /// Conflict errors (e.g., duplicate entries)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Bcrypt errors
    #[error("Bcrypt error: {0}")]
    Bcrypt(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimit { retry_after_secs: u64 },

    /// Bad request errors
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Request ID for tracking
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AppError {
    /// Shorthand for a missing entity
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        AppError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`
    pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(message.to_string())
            }
            _ => AppError::Database(err),
        }
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Database(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Authentication(_) => "AUTHENTICATION_ERROR",
            AppError::Authorization(_) => "AUTHORIZATION_ERROR",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::Conflict(_) => "CONFLICT",
            AppError::RateLimit { .. } => "RATE_LIMIT_EXCEEDED",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Jwt(_) => "INVALID_TOKEN",
            AppError::Bcrypt(_) => "BCRYPT_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Config(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Check if this error is an operational error (expected errors)
    pub fn is_operational(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message safe to show to clients. Server-side failures are masked.
    fn public_message(&self) -> String {
        if self.is_operational() {
            match self {
                AppError::Database(sqlx::Error::RowNotFound) => "Resource not found".to_string(),
                AppError::Database(_) => "Resource already exists".to_string(),
                AppError::Jwt(_) => "Invalid or expired token".to_string(),
                other => other.to_string(),
            }
        } else {
            "Internal server error".to_string()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if !self.is_operational() {
            tracing::error!(error = %self, code = error_code, "Request failed");
        }

        let mut body = json!({
            "success": false,
            "error": self.public_message(),
            "code": error_code,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        // Add validation details if present
        if let AppError::Validation(validation_errors) = &self {
            let details: HashMap<String, Vec<String>> = validation_errors
                .field_errors()
                .iter()
                .map(|(field, errors)| {
                    let messages = errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    (field.to_string(), messages)
                })
                .collect();
            body["details"] = json!(details);
        }

        let mut response = (status, Json(body)).into_response();

        if let AppError::RateLimit { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Convert bcrypt errors to AppError
impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Bcrypt(err.to_string())
    }
}

/// Convert JSON body rejections to AppError
impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        match err {
            JsonRejection::JsonDataError(err) => {
                AppError::BadRequest(format!("Invalid JSON: {}", err))
            }
            JsonRejection::JsonSyntaxError(err) => {
                AppError::BadRequest(format!("JSON syntax error: {}", err))
            }
            JsonRejection::MissingJsonContentType(_) => {
                AppError::BadRequest("Missing JSON content type".to_string())
            }
            _ => AppError::BadRequest("Invalid request body".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_codes() {
        let error = AppError::Authentication("missing session".to_string());
        assert_eq!(error.error_code(), "AUTHENTICATION_ERROR");
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);

        let error = AppError::Authorization("not the owner".to_string());
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);

        let error = AppError::InvalidState("Request already accepted".to_string());
        assert_eq!(error.error_code(), "INVALID_STATE");
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_error() {
        let error = AppError::not_found("Company", "123");
        assert_eq!(error.error_code(), "NOT_FOUND");
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.to_string(), "Company not found: 123");
    }

    #[test]
    fn test_operational_error() {
        assert!(AppError::Authorization("test".to_string()).is_operational());
        assert!(!AppError::Internal("internal error".to_string()).is_operational());
        assert!(!AppError::Database(sqlx::Error::PoolTimedOut).is_operational());
    }

    #[tokio::test]
    async fn test_forbidden_body_carries_reason() {
        let (status, body) = body_json(AppError::Authorization("Not allowed".to_string())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "AUTHORIZATION_ERROR");
        assert_eq!(body["error"], "Authorization error: Not allowed");
    }

    #[tokio::test]
    async fn test_internal_details_are_masked() {
        let (status, body) =
            body_json(AppError::Internal("connection string leaked".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_rate_limit_sets_retry_after() {
        let response = AppError::RateLimit { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
