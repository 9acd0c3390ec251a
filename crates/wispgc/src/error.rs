//! Error types for wispgc

use thiserror::Error;

/// Main error type for wispgc operations
#[derive(Error, Debug)]
pub enum WispError {
    /// Record-store errors (listing, mutation, event persistence)
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Report delivery errors
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Per-record timestamp parse errors
    #[error("Timestamp error: {0}")]
    Timestamp(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// General errors
    #[error("{0}")]
    General(String),
}

/// Result type alias for wispgc operations
pub type Result<T> = std::result::Result<T, WispError>;
