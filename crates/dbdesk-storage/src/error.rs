//! Error types for dbdesk-storage

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
