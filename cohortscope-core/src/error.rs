//! Error types for cohortscope-core

use thiserror::Error;

/// Main error type for the cohortscope-core library
#[derive(Error, Debug)]
pub enum Error {
    /// A raw record failed validation during aggregation
    #[error("malformed input in field '{field}': {message}")]
    MalformedInput { field: String, message: String },

    /// A grouping key appeared more than once in a comparator input
    #[error("duplicate group key '{key}' in {side} period")]
    DuplicateKey { key: String, side: &'static str },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for cohortscope-core
pub type Result<T> = std::result::Result<T, Error>;
