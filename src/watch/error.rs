use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to store notice: {0}")]
    Store(#[from] StoreError),

    #[error("Notice rejected: {0}")]
    Rejected(String),
}

/// Failures that abort a check cycle
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Failed to load update cursor: {0}")]
    LoadCursor(#[source] StoreError),

    #[error("Failed to persist update cursor: {0}")]
    PersistCursor(#[source] StoreError),
}
