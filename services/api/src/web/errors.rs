//! services/api/src/web/errors.rs
//!
//! Maps core and store failures onto HTTP responses with a JSON body of the form
//! `{"error": <kind>, "message": <text>}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use school_ops_core::presence::ExportError;
use school_ops_core::{CoreError, PortError, ValidationError};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub enum HttpError {
    /// Malformed query or path input.
    BadRequest(String),
    Validation(String),
    NotFound(String),
    Forbidden(String),
    Internal(String),
}

impl HttpError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        HttpError::NotFound(message.into())
    }

    /// The human-readable part, for channels that carry no status code.
    pub fn into_message(self) -> String {
        self.parts().2
    }

    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            HttpError::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m),
            HttpError::Validation(m) => (StatusCode::UNPROCESSABLE_ENTITY, "validation", m),
            HttpError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m),
            HttpError::Forbidden(m) => (StatusCode::FORBIDDEN, "permission_denied", m),
            HttpError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", m),
        }
    }
}

impl From<ValidationError> for HttpError {
    fn from(value: ValidationError) -> Self {
        HttpError::Validation(value.to_string())
    }
}

impl From<PortError> for HttpError {
    fn from(value: PortError) -> Self {
        match value {
            PortError::NotFound(m) => HttpError::NotFound(m),
            PortError::PermissionDenied(m) => HttpError::Forbidden(m),
            PortError::Unexpected(m) => HttpError::Internal(m),
        }
    }
}

impl From<CoreError> for HttpError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::Validation(e) => e.into(),
            CoreError::Store(e) => e.into(),
        }
    }
}

impl From<ExportError> for HttpError {
    fn from(value: ExportError) -> Self {
        HttpError::Internal(value.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.parts();
        if status.is_server_error() {
            error!(kind, "{}", message);
        }
        let body = Json(ErrorBody {
            error: kind.to_string(),
            message,
        });
        (status, body).into_response()
    }
}
