//! Error types for the LuckyReels game server
//!
//! Storage, configuration and validation failures share one root type so the
//! ledger and API layers can decide per call site whether to recover or reject.

use thiserror::Error;

/// Root error type for all LuckyReels operations
#[derive(Debug, Error)]
pub enum LuckyError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Persistence layer errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Caller supplied input that failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    #[error("Missing required field: {0}")]
    MissingRequired(String),
    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Storage system errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database open failed: {0}")]
    DatabaseOpenFailed(String),
    #[error("Read failed: {0}")]
    ReadFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Corrupted data: {0}")]
    CorruptedData(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Field-level validation failures, rendered verbatim to API callers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Wallet address is required")]
    MissingWallet,
    #[error("Wallet address format is invalid")]
    InvalidWallet,
    #[error("{field}: {reason}")]
    InvalidField { field: String, reason: String },
}

impl ValidationError {
    pub fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<rocksdb::Error> for LuckyError {
    fn from(e: rocksdb::Error) -> Self {
        LuckyError::Storage(StorageError::WriteFailed(e.to_string()))
    }
}

impl From<std::io::Error> for LuckyError {
    fn from(e: std::io::Error) -> Self {
        LuckyError::Storage(StorageError::ReadFailed(e.to_string()))
    }
}

impl From<serde_json::Error> for LuckyError {
    fn from(e: serde_json::Error) -> Self {
        LuckyError::Storage(StorageError::CorruptedData(e.to_string()))
    }
}

// Convenience type alias for Results
pub type LuckyResult<T> = Result<T, LuckyError>;
