//! In-memory backend
//!
//! Nested map behind a single RwLock. Store/Retrieve/Delete are O(1).

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::Result;

use super::ObjectStore;

/// Keeps every object in process memory, keyed by bucket then object
#[derive(Debug, Default)]
pub struct MemStore {
    buckets: RwLock<HashMap<String, HashMap<String, Bytes>>>,
}

impl MemStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.read().len()
    }
}

impl ObjectStore for MemStore {
    fn store(&self, payload: &[u8], object_id: &str, bucket_id: &str) -> Result<bool> {
        let mut buckets = self.buckets.write();
        let bucket = buckets.entry(bucket_id.to_string()).or_default();
        let previous = bucket.insert(object_id.to_string(), Bytes::copy_from_slice(payload));
        Ok(previous.is_some())
    }

    fn retrieve(&self, object_id: &str, bucket_id: &str) -> Result<Option<Bytes>> {
        let buckets = self.buckets.read();
        Ok(buckets
            .get(bucket_id)
            .and_then(|bucket| bucket.get(object_id))
            .cloned())
    }

    fn delete(&self, object_id: &str, bucket_id: &str) -> Result<bool> {
        let mut buckets = self.buckets.write();
        let Some(bucket) = buckets.get_mut(bucket_id) else {
            return Ok(false);
        };
        if bucket.remove(object_id).is_none() {
            return Ok(false);
        }
        if bucket.is_empty() {
            buckets.remove(bucket_id);
        }
        Ok(true)
    }
}
