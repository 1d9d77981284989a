//! Error types for swap-cards

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The query-level self-exclusion failed and a self-proposal reached grouping.
    #[error("Invariant violation: proposal {proposal_id} on swap {swap_id}: {detail}")]
    InvariantViolation {
        swap_id: String,
        proposal_id: String,
        detail: String,
    },

    #[error("Store access failed: {0}")]
    StoreAccess(String),

    #[error("Aggregation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Stable machine-readable code surfaced to API clients
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::NotFound(_) => "NOT_FOUND",
            StorageError::InvalidInput(_) => "VALIDATION_ERROR",
            StorageError::InvariantViolation { .. } => "INVARIANT_VIOLATION",
            StorageError::StoreAccess(_) => "STORE_ACCESS_FAILURE",
            StorageError::Cancelled => "CANCELLED",
            StorageError::Io(_)
            | StorageError::Json(_)
            | StorageError::Config(_)
            | StorageError::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::StoreAccess(e.to_string())
    }
}
