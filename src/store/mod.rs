//! Store Module
//!
//! The storage capability shared by every backend.
//!
//! ## Backends
//! - [`MemStore`]: one lock around a nested map, nothing persisted
//! - [`FileStore`]: one record file per bucket, rewritten through a
//!   temporary file and an atomic rename on every mutation
//!
//! The backend is chosen once at startup by [`open_store`].

mod memory;
pub mod file;

use std::fs;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::{BackendKind, Config};
use crate::error::{Result, StoreError};

pub use file::{FileStore, LoadReport, ObjectLayout};
pub use memory::MemStore;

/// Object storage partitioned into buckets.
///
/// Both identifiers are expected to match `[a-z0-9_-]+`; the request layer
/// checks this before calling in.
pub trait ObjectStore: Send + Sync {
    /// Create or replace `object_id` in `bucket_id`, creating the bucket if
    /// needed. Returns `true` if an existing object was replaced.
    fn store(&self, payload: &[u8], object_id: &str, bucket_id: &str) -> Result<bool>;

    /// Read an object. Returns `Ok(None)` if the bucket or object does not exist.
    fn retrieve(&self, object_id: &str, bucket_id: &str) -> Result<Option<Bytes>>;

    /// Delete an object, dropping the bucket once it is empty.
    /// Returns `true` if the object existed.
    fn delete(&self, object_id: &str, bucket_id: &str) -> Result<bool>;
}

/// Open the backend selected by `config`
pub fn open_store(config: &Config) -> Result<Arc<dyn ObjectStore>> {
    config.validate()?;
    match config.backend {
        BackendKind::Memory => Ok(Arc::new(MemStore::new())),
        BackendKind::File => Ok(Arc::new(open_file_store(config)?)),
    }
}

/// Open the file backend rooted at `config.data_dir`, creating the
/// directory if it is missing
pub fn open_file_store(config: &Config) -> Result<FileStore> {
    fs::create_dir_all(&config.data_dir).map_err(|e| {
        StoreError::Config(format!(
            "cannot create storage directory {}: {}",
            config.data_dir.display(),
            e
        ))
    })?;
    FileStore::open_with_config(config)
}

/// Whether `id` matches `[a-z0-9_-]+`
pub fn is_valid_identifier(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
}

/// Return `InvalidIdentifier` unless `id` matches `[a-z0-9_-]+`
pub fn check_identifier(id: &str) -> Result<()> {
    if is_valid_identifier(id) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(id.to_string()))
    }
}
