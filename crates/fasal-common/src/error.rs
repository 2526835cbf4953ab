//! Error taxonomy shared across the Fasal crates.

use thiserror::Error;

/// Broad classification of every failure the engine reports.
///
/// Everything except [`ErrorKind::Storage`] is recoverable and leaves engine
/// state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A crop, scenario, action, challenge, or achievement is missing
    NotFound,
    /// The entity is in the wrong state for the requested operation
    InvalidState,
    /// A coin charge exceeds the balance
    InsufficientFunds,
    /// Malformed or out-of-range input
    InvalidInput,
    /// A committed mutation could not be persisted
    Storage,
}

impl ErrorKind {
    /// Whether the caller may simply show the message and let the user retry.
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        !matches!(self, Self::Storage)
    }
}

/// Storage backend errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored data was written by an incompatible schema
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },

    /// Backend refused or lost the write
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
