use thiserror::Error;

/// Errors raised by progress store backends. None leaves a partially applied
/// write behind. `NotFound`, `AlreadyExists` and `Completed` describe the
/// stored record and fail the same way on retry; see [`StoreError::is_transient`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no progress session for {0}")]
    NotFound(String),
    #[error("progress session for {0} already exists")]
    AlreadyExists(String),
    #[error("progress session for {0} is complete and read-only")]
    Completed(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed session record: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store operation interrupted: {0}")]
    Interrupted(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether repeating the same call may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            StoreError::NotFound(_) | StoreError::AlreadyExists(_) | StoreError::Completed(_)
        )
    }
}
