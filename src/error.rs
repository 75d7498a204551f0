//! Pipeline error types
//!
//! Every failure surfaces as a single [`GenerateError`] carrying its kind, so
//! an outer transport layer can map it onto a status code and a `{kind, message}`
//! body without inspecting the source.

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::common::QRError;

/// Remote logo retrieval failures.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Logo URL must use http or https: {0}")]
    UnsupportedScheme(String),
    #[error("Logo request timed out after {0}s")]
    Timeout(u64),
    #[error("Logo request returned status {0}")]
    Status(u16),
    #[error("Logo exceeds the {limit} byte limit")]
    TooLarge { limit: usize },
    #[error("Logo request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Persistence failures. Lookups never produce these; they degrade to a miss.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid artifact identifier {0:?}")]
    InvalidIdentifier(String),
}

impl StorageError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| StorageError::Io { op, path, source }
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Failed to encode QR: {0}")]
    Encoding(#[from] QRError),
    #[error("Failed to {context}: {message}")]
    Composite { context: &'static str, message: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl GenerateError {
    pub fn validation(message: impl Into<String>) -> Self {
        GenerateError::Validation(message.into())
    }

    pub(crate) fn composite(context: &'static str, err: impl std::fmt::Display) -> Self {
        GenerateError::Composite { context, message: err.to_string() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerateError::Validation(_) => ErrorKind::ValidationError,
            GenerateError::Fetch(_) => ErrorKind::FetchError,
            GenerateError::Encoding(_) => ErrorKind::EncodingError,
            GenerateError::Composite { .. } => ErrorKind::CompositeError,
            GenerateError::Storage(_) => ErrorKind::StorageError,
        }
    }

    /// Status code for an HTTP front end: client errors are 400, the rest 500.
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::ValidationError => 400,
            _ => 500,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody { kind: self.kind(), message: self.to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ValidationError,
    FetchError,
    EncodingError,
    CompositeError,
    StorageError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

pub type GenerateResult<T> = Result<T, GenerateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let err = GenerateError::validation("Parameter \"size\" must be a number between 100 and 2048");
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.to_string(), "Parameter \"size\" must be a number between 100 and 2048");
    }

    #[test]
    fn test_internal_kinds_map_to_500() {
        let errs = [
            GenerateError::from(FetchError::Status(404)),
            GenerateError::from(QRError::DataTooLong),
            GenerateError::composite("decode logo", "bad magic"),
            GenerateError::from(StorageError::InvalidIdentifier(String::new())),
        ];
        for err in errs {
            assert_eq!(err.http_status(), 500, "{err}");
        }
    }

    #[test]
    fn test_body_serialization() {
        let body = GenerateError::from(FetchError::TooLarge { limit: 10 }).to_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["kind"], "FetchError");
        assert_eq!(json["message"], "Logo exceeds the 10 byte limit");
    }

    #[test]
    fn test_storage_io_message() {
        let err = StorageError::io("write", "/tmp/x.png")(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert_eq!(err.to_string(), "Failed to write /tmp/x.png: disk full");
    }
}
