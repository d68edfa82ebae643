use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Requirement not tracked: {0}")]
    UnknownRequirement(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Index returned status {status} for {name}")]
    Status {
        name: String,
        status: reqwest::StatusCode,
    },

    #[error("Invalid index response: {0}")]
    InvalidResponse(String),

    #[error("No published versions for {0}")]
    NoVersions(String),
}

/// Failure of a single requirement's update task
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Failed to resolve latest version: {0}")]
    Resolve(#[from] IndexError),

    #[error("Failed to persist version: {0}")]
    Persist(#[from] StoreError),
}

/// Run-fatal failure of a sync run
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to load tracked requirements: {0}")]
    Load(#[from] StoreError),
}
