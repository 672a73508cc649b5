use thiserror::Error;

/// Failures talking to the search cluster. None of these are retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to search cluster failed")]
    Http(#[from] reqwest::Error),

    #[error("search cluster answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response from search cluster")]
    Json(#[from] serde_json::Error),
}

/// Failures that stop a [`BatchLoader`][crate::BatchLoader] run. Per-document bulk failures are
/// not in here: those end up in the [`LoadReport`][crate::LoadReport].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
