//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use tubely_pipeline::{ErrorKind, StoreError, UploadError};
use tubely_storage::StorageError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("External tool error: {0}")]
    ExternalTool(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ExternalTool(_) | ApiError::Storage(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Validation(_) => "validation",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::ExternalTool(_) => "external_tool",
            ApiError::Storage(_) => "storage",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        let message = match &e {
            UploadError::Validation(msg)
            | UploadError::Auth(msg)
            | UploadError::Storage(msg)
            | UploadError::NotFound(msg) => msg.clone(),
            other => other.to_string(),
        };

        match e.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Auth => Self::Unauthorized(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::ExternalTool => Self::ExternalTool(message),
            ErrorKind::Storage => Self::Storage(message),
            ErrorKind::Io => Self::Internal(message),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        UploadError::from(e).into()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::ExternalTool(_) | ApiError::Storage(_) | ApiError::Internal(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            detail,
            code: Some(self.code().to_string()),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubely_media::MediaError;

    #[test]
    fn test_upload_error_status() {
        let cases = [
            (UploadError::validation("bad type"), StatusCode::BAD_REQUEST),
            (UploadError::auth("not yours"), StatusCode::UNAUTHORIZED),
            (UploadError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (
                UploadError::from(MediaError::Timeout(300)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (UploadError::storage("503"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_codes() {
        assert_eq!(ApiError::from(UploadError::validation("x")).code(), "validation");
        assert_eq!(
            ApiError::from(StorageError::presign_failed("x")).code(),
            "storage"
        );

        let too_large = ApiError::PayloadTooLarge("limit".into());
        assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(too_large.code(), "payload_too_large");
    }
}
