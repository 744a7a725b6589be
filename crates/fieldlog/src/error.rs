//! Error types for fieldlog.
//!
//! This module defines all error types used throughout the fieldlog crate,
//! providing detailed context for debugging and user-facing messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationError;

/// The main error type for fieldlog operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Validation Errors ===
    /// A submitted field was missing or malformed.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    // === Record Store Errors ===
    /// The record store answered with a non-success status.
    #[error("server rejected {operation} ({status}): {message}")]
    StoreRejected {
        /// The operation that was rejected (`create`, `list`, `delete`, `report`).
        operation: &'static str,
        /// HTTP status code returned by the store.
        status: u16,
        /// Response body or reason text.
        message: String,
    },

    /// The store answered successfully but the payload made no sense.
    #[error("unexpected response from {operation}: {message}")]
    UnexpectedResponse {
        /// The operation being performed.
        operation: &'static str,
        /// Description of what was wrong.
        message: String,
    },

    /// The HTTP transport failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A URL could not be parsed or joined.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // === Media Errors ===
    /// Uploading a photo to the media store failed.
    #[error("media upload failed ({status}): {message}")]
    MediaUpload {
        /// HTTP status code, or 0 for local failures.
        status: u16,
        /// Description of what went wrong.
        message: String,
    },

    /// A resolved image URL could not be loaded.
    #[error("image unavailable at {url}: {message}")]
    ImageUnavailable {
        /// The URL that failed to load.
        url: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Local Database Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Device Errors ===
    /// A device permission was refused.
    #[error("permission denied: {permission}")]
    PermissionDenied {
        /// Name of the refused permission.
        permission: String,
    },

    /// The device could not produce a position fix.
    #[error("no position fix: {0}")]
    NoFix(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read an input file.
    #[error("failed to read {path}: {source}")]
    FileRead {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for fieldlog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a store rejection error.
    #[must_use]
    pub fn store_rejected(operation: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::StoreRejected {
            operation,
            status,
            message: message.into(),
        }
    }

    /// Create an unexpected response error.
    #[must_use]
    pub fn unexpected_response(operation: &'static str, message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            operation,
            message: message.into(),
        }
    }

    /// Create a media upload error.
    #[must_use]
    pub fn media_upload(status: u16, message: impl Into<String>) -> Self {
        Self::MediaUpload {
            status,
            message: message.into(),
        }
    }

    /// Create an image unavailable error.
    #[must_use]
    pub fn image_unavailable(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ImageUnavailable {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error came from the record store or the network.
    #[must_use]
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::StoreRejected { .. } | Self::UnexpectedResponse { .. } | Self::Http(_)
        )
    }

    /// Check if this error is a refused device permission.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err: Error = ValidationError::MissingName.into();
        assert_eq!(err.to_string(), "validation failed: Name is required.");
        assert!(err.is_validation());
        assert!(!err.is_store_failure());
    }

    #[test]
    fn test_store_rejected_display() {
        let err = Error::store_rejected("delete", 401, "JWT expired");
        let msg = err.to_string();
        assert!(msg.contains("delete"));
        assert!(msg.contains("401"));
        assert!(msg.contains("JWT expired"));
        assert!(err.is_store_failure());
    }

    #[test]
    fn test_unexpected_response_is_store_failure() {
        let err = Error::unexpected_response("create", "empty array");
        assert!(err.is_store_failure());
        assert!(err.to_string().contains("empty array"));
    }

    #[test]
    fn test_permission_error() {
        let err = Error::PermissionDenied {
            permission: "location".to_string(),
        };
        assert!(err.is_permission_error());
        assert_eq!(err.to_string(), "permission denied: location");
        assert!(!Error::internal("x").is_permission_error());
    }

    #[test]
    fn test_media_upload_display() {
        let err = Error::media_upload(400, "Upload preset not found");
        assert_eq!(
            err.to_string(),
            "media upload failed (400): Upload preset not found"
        );
    }

    #[test]
    fn test_image_unavailable_display() {
        let err = Error::image_unavailable("https://cdn/x.jpg", "404 Not Found");
        let msg = err.to_string();
        assert!(msg.contains("https://cdn/x.jpg"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::config("store.url is required");
        assert!(err.to_string().contains("store.url"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_url_error() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Url(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_file_read_error_display() {
        let err = Error::FileRead {
            path: PathBuf::from("/tmp/missing.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/tmp/missing.jpg"));
    }

    #[test]
    fn test_database_open_error_display() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err = Error::DatabaseOpen {
                path: PathBuf::from("/nonexistent/path/db.sqlite"),
                source: sqlite_err,
            };
            assert!(err.to_string().contains("/nonexistent/path/db.sqlite"));
        }
    }
}
