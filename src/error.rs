use thiserror::Error;

use crate::storage::StorageError;

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("archive not found")]
    NotFound,
    #[error("archive {id} is corrupted: {reason}")]
    Corrupted { id: String, reason: String },
    #[error("archive limit reached: {current} of {max} archives in use")]
    LimitReached { current: usize, max: usize },
    #[error("storage quota exceeded: {projected} of {limit} bytes")]
    QuotaExceeded { projected: u64, limit: u64 },
    #[error("storage access denied")]
    SecurityDenied,
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ArchiveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<StorageError> for ArchiveError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::QuotaExceeded { projected, limit } => {
                Self::QuotaExceeded { projected, limit }
            }
            StorageError::AccessDenied => Self::SecurityDenied,
        }
    }
}
