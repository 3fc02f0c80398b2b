//! Pipeline error types.

use std::fmt;

use thiserror::Error;
use tubely_media::MediaError;
use tubely_models::AssetId;
use tubely_storage::StorageError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Asset not found: {0}")]
    NotFound(AssetId),

    #[error("Metadata store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Coarse error class, used for responses, logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Auth,
    ExternalTool,
    Storage,
    NotFound,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Auth => "auth",
            ErrorKind::ExternalTool => "external_tool",
            ErrorKind::Storage => "storage",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type UploadResult<T> = Result<T, UploadError>;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Auth(String),

    #[error("External tool error: {0}")]
    ExternalTool(MediaError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::Validation(_) => ErrorKind::Validation,
            UploadError::Auth(_) => ErrorKind::Auth,
            UploadError::ExternalTool(_) => ErrorKind::ExternalTool,
            UploadError::Storage(_) => ErrorKind::Storage,
            UploadError::NotFound(_) => ErrorKind::NotFound,
            UploadError::Io(_) => ErrorKind::Io,
        }
    }

    /// Captured stderr of a failed tool run, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            UploadError::ExternalTool(e) => e.diagnostics(),
            _ => None,
        }
    }
}

impl From<MediaError> for UploadError {
    fn from(e: MediaError) -> Self {
        match e {
            // The file is not a video; that's the caller's problem.
            MediaError::NoVideoStream => Self::Validation("no video stream found".to_string()),
            other => Self::ExternalTool(other),
        }
    }
}

impl From<StorageError> for UploadError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<StoreError> for UploadError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(format!("video {} not found", id)),
            StoreError::Backend(msg) => Self::Storage(msg),
        }
    }
}
