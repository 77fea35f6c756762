//! Error types for runx

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for runx operations
#[derive(Error, Debug)]
pub enum RunxError {
    /// Construction errors
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// File-related errors
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported format for {operation}: {path}")]
    UnsupportedFormat { path: PathBuf, operation: String },

    /// Content errors
    #[error("Failed to parse {format} file {path}: {reason}")]
    ParseError {
        path: PathBuf,
        format: String,
        reason: String,
    },

    #[error("Evaluation failed at {path}:{line}: {reason}")]
    EvaluationError {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Access errors
    #[error("Key not found: {key}")]
    KeyNotFound { key: String },

    #[error("Type mismatch for {key}: {reason}")]
    TypeMismatch { key: String, reason: String },

    /// Meter errors
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RunxError {
    /// Create a new invalid argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a new file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new unsupported format error
    pub fn unsupported_format(path: impl Into<PathBuf>, operation: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            path: path.into(),
            operation: operation.into(),
        }
    }

    /// Create a new parse error
    pub fn parse_error(
        path: impl Into<PathBuf>,
        format: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::ParseError {
            path: path.into(),
            format: format.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a new evaluation error
    pub fn evaluation_error(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::EvaluationError {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create a new key not found error
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Create a new type mismatch error
    pub fn type_mismatch(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a new shape mismatch error
    pub fn shape_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Result type alias for runx operations
pub type Result<T> = std::result::Result<T, RunxError>;
