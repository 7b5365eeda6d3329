use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Request-level error taxonomy. Everything a handler can fail with maps to
/// exactly one of these; infrastructure errors are wrapped and never leaked.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("validation failed")]
    FieldValidation(BTreeMap<String, String>),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    /// Validation failure attached to a single field.
    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(name.into(), message.into());
        Self::FieldValidation(fields)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::FieldValidation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) | Self::FieldValidation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Unauthenticated(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Validation(msg) => msg.clone(),
            Self::FieldValidation(_) => "Validation failed".to_string(),
            // Never leak internal details to the client.
            Self::Internal(_) | Self::Database(_) => "An internal error occurred".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
            }
            Self::Database(e) => {
                tracing::error!(error = ?e, "database error");
            }
            _ => {
                tracing::warn!(error = %self, "request failed");
            }
        }

        let status = self.status_code();
        let fields = match &self {
            Self::FieldValidation(fields) => Some(fields.clone()),
            _ => None,
        };
        let body = ErrorBody {
            code: self.error_code().to_string(),
            message: self.public_message(),
            fields,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_error_serializes_fields() {
        let err = ApiError::field("end_date", "End date is required");
        let fields = match &err {
            ApiError::FieldValidation(f) => f,
            _ => panic!("expected field validation"),
        };
        assert_eq!(fields.get("end_date").unwrap(), "End date is required");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(
            ApiError::Unauthenticated("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("hr only".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::not_found("profile").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::validation("bad input").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_errors_are_opaque() {
        let err = ApiError::Internal(anyhow::anyhow!("secret connection string"));
        assert_eq!(err.public_message(), "An internal error occurred");
    }
}
