// Error taxonomy for store mutations.
// Derived views (filter, staleness, markers) are total functions and have
// no error path of their own.

use thiserror::Error;

use crate::model::BinId;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Invalid input rejected before any state change (blank name,
    /// out-of-range coordinates).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Mutation referenced an id the store does not know.
    #[error("bin {0} not found")]
    NotFound(BinId),

    /// Durable-write failure reported by the storage collaborator. The
    /// in-memory view stays on the last durably applied state.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
