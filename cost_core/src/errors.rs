//! # Error Types
//!
//! Structured error types for cost_core. The costing pipeline itself never
//! fails (it degrades to zero-valued components and records a
//! [`Diagnostic`](crate::diagnostics::Diagnostic)); these errors are for the
//! outer operations around it: validating geometry on request, compiling
//! formula text, and reading or writing job snapshots.
//!
//! ## Example
//!
//! ```rust
//! use cost_core::errors::{CostError, CostResult};
//!
//! fn validate_batch(batch_volume: u32) -> CostResult<()> {
//!     if batch_volume == 0 {
//!         return Err(CostError::InvalidInput {
//!             field: "batch_volume".to_string(),
//!             value: batch_volume.to_string(),
//!             reason: "Batch volume must be at least 1".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for cost_core operations
pub type CostResult<T> = Result<T, CostError>;

/// Structured error type for costing operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CostError {
    /// An input value is invalid (out of range, inconsistent dimensions, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A referenced catalog record does not exist
    #[error("{kind} not found: {reference}")]
    NotFound { kind: String, reference: String },

    /// A process formula could not be compiled
    #[error("Formula error in '{process}': {reason}")]
    Formula { process: String, reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl CostError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CostError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(kind: impl Into<String>, reference: impl Into<String>) -> Self {
        CostError::NotFound {
            kind: kind.into(),
            reference: reference.into(),
        }
    }

    /// Create a Formula error
    pub fn formula(process: impl Into<String>, reason: impl Into<String>) -> Self {
        CostError::Formula {
            process: process.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CostError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CostError::FileError { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CostError::InvalidInput { .. } => "INVALID_INPUT",
            CostError::NotFound { .. } => "NOT_FOUND",
            CostError::Formula { .. } => "FORMULA_ERROR",
            CostError::FileError { .. } => "FILE_ERROR",
            CostError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CostError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

impl From<serde_json::Error> for CostError {
    fn from(e: serde_json::Error) -> Self {
        CostError::SerializationError { reason: e.to_string() }
    }
}
