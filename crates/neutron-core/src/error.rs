//! Error types for neutron-core

use thiserror::Error;

/// Result type alias using neutron-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in neutron-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Save blob storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Local state file could not be read or parsed
    #[error("Local state error at {path}: {message}")]
    LocalState { path: String, message: String },
}
