//! # Centralized Error Handling
//!
//! Unified error types for the entire crate using `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for shardr operations
#[derive(Error, Debug)]
pub enum ShardrError {
    /// I/O errors (file missing, permission denied, read/write failures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed variant record (too few fields, non-numeric position)
    #[error("VCF error: {message}")]
    Vcf { message: String },

    /// Invalid data errors (short mindex, list length mismatch)
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Configuration errors (invalid CLI arguments)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File not found errors
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Parse errors in the shards table
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Violated internal invariants; indicates a bug in the caller or in
    /// the index files rather than an environmental failure
    #[error("Invariant violated (bug?): {message}")]
    Bug { message: String },
}

/// Type alias for Results using ShardrError
pub type Result<T> = std::result::Result<T, ShardrError>;

impl ShardrError {
    /// Create a VCF record error with a message
    pub fn vcf(message: impl Into<String>) -> Self {
        Self::Vcf {
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create an invariant-violation error
    pub fn bug(message: impl Into<String>) -> Self {
        Self::Bug {
            message: message.into(),
        }
    }
}
