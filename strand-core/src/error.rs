//! # Error Types for Strand
//!
//! Rejected input aborts the operation that received it. A refused `bind`
//! is not an error: it is reported as `false` by the binding call itself.

use thiserror::Error;

/// Main error type for Strand operations
#[derive(Error, Debug)]
pub enum StrandError {
    /// Key text contained something other than '1', '0' or 'x'
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Key would have no concrete position
    #[error("Key has no concrete position")]
    EmptyKey,

    /// Splice point falls outside the chromatid
    #[error("Crossover point {point} maps to index {index}, outside 0..={len}")]
    CrossoverOutOfRange { point: i64, index: i64, len: usize },

    /// Expression function assembled from inconsistent parts
    #[error("Invalid expression function: {0}")]
    InvalidExpression(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for Strand operations
pub type StrandResult<T> = Result<T, StrandError>;

impl StrandError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid key error
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Create an invalid expression error
    pub fn invalid_expression(msg: impl Into<String>) -> Self {
        Self::InvalidExpression(msg.into())
    }
}

impl From<serde_json::Error> for StrandError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
