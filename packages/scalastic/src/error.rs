//! Error types for scalastic

use std::fmt;
use thiserror::Error;

/// Partition error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or empty argument (id, index, bulk body)
    InvalidArgument,
    /// Bulk payload entry without a preceding action entry
    MalformedBulk,
    /// Invalid configuration value or file
    Config,
    /// Raised by the search engine adapter, passed through untouched
    Engine,
    /// Serialization/deserialization errors
    Serialization,
    /// I/O errors
    IO,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::MalformedBulk => "malformed_bulk",
            ErrorKind::Config => "config",
            ErrorKind::Engine => "engine",
            ErrorKind::Serialization => "serialization",
            ErrorKind::IO => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Partition error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct PartitionError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl PartitionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// `Missing required argument <name>`
    pub fn missing_argument(name: &str) -> Self {
        Self::invalid_argument(format!("Missing required argument {}", name))
    }

    pub fn malformed_bulk(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedBulk, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Engine, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn is_engine(&self) -> bool {
        self.kind == ErrorKind::Engine
    }
}

// JSON error conversions
impl From<serde_json::Error> for PartitionError {
    fn from(err: serde_json::Error) -> Self {
        PartitionError::serialization(format!("JSON error: {}", err)).with_source(err)
    }
}

// YAML error conversions
impl From<serde_yaml::Error> for PartitionError {
    fn from(err: serde_yaml::Error) -> Self {
        PartitionError::serialization(format!("YAML error: {}", err)).with_source(err)
    }
}

impl From<std::io::Error> for PartitionError {
    fn from(err: std::io::Error) -> Self {
        PartitionError::new(ErrorKind::IO, format!("IO error: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PartitionError>;
