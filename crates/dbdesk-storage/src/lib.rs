//! Durable key-value storage for dbdesk preferences
//!
//! Values are opaque strings (usually JSON blobs) stored under short,
//! versioned keys such as `dbdesk.shortcuts.v1`.
//! - [`MemoryStore`]: process-local, lost on exit
//! - [`FileStore`]: one file per key under a data directory

pub mod error;
pub mod file;
pub mod memory;

pub use error::{Result, StorageError};
pub use file::FileStore;
pub use memory::MemoryStore;

/// A string key-value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Keys become file names, so only a conservative alphabet is allowed
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
