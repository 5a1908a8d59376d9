//! Bucket Registry
//!
//! Maps bucket ids to their file and stripe. The registry mutex is held
//! only while the map is read or changed and while the bucket's stripe lock
//! is being acquired; it is released before any file I/O.
//!
//! ## Lock Order
//! registry → stripe, never the reverse. Code holding a stripe lock that
//! needs the registry must drop the stripe first (see [`BucketRegistry::remove_if_empty`]).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLockReadGuard, RwLockWriteGuard};

use super::chain::ObjectChain;
use super::stripes::{Stripe, StripeLocks};
use super::BUCKET_EXTENSION;

/// Where a bucket lives. Fixed for the bucket's whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketEntry {
    pub file_path: PathBuf,
    pub stripe: usize,
}

/// Top-level bucket map plus the stripes holding each bucket's chain
#[derive(Debug)]
pub struct BucketRegistry {
    root: PathBuf,
    buckets: Mutex<HashMap<String, BucketEntry>>,
    stripes: StripeLocks,
}

impl BucketRegistry {
    /// Empty registry for bucket files under `root`
    pub fn new(root: &Path, stripe_count: usize) -> Self {
        Self {
            root: root.to_path_buf(),
            buckets: Mutex::new(HashMap::new()),
            stripes: StripeLocks::new(stripe_count),
        }
    }

    /// Registry populated with chains rebuilt from disk
    pub fn with_buckets(
        root: &Path,
        stripe_count: usize,
        loaded: impl IntoIterator<Item = (String, ObjectChain)>,
    ) -> Self {
        let registry = Self::new(root, stripe_count);
        {
            let mut buckets = registry.buckets.lock();
            for (bucket_id, chain) in loaded {
                let entry = registry.new_entry(&bucket_id);
                registry
                    .stripes
                    .write(entry.stripe)
                    .insert_chain(bucket_id.clone(), chain);
                buckets.insert(bucket_id, entry);
            }
        }
        registry
    }

    /// File a bucket is persisted to
    pub fn bucket_path(&self, bucket_id: &str) -> PathBuf {
        self.root.join(format!("{}.{}", bucket_id, BUCKET_EXTENSION))
    }

    /// Number of registered buckets
    pub fn len(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Number of stripe locks
    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    /// Register the bucket if needed and lock its stripe for writing
    ///
    /// The returned flag is `true` if the bucket was registered by this call.
    pub fn resolve_or_create(
        &self,
        bucket_id: &str,
    ) -> (BucketEntry, bool, RwLockWriteGuard<'_, Stripe>) {
        let mut buckets = self.buckets.lock();
        let (entry, created) = match buckets.get(bucket_id) {
            Some(entry) => (entry.clone(), false),
            None => {
                let entry = self.new_entry(bucket_id);
                buckets.insert(bucket_id.to_string(), entry.clone());
                (entry, true)
            }
        };
        let stripe = self.stripes.write(entry.stripe);
        drop(buckets);

        (entry, created, stripe)
    }

    /// Find a bucket and lock its stripe for reading
    pub fn lookup_read(&self, bucket_id: &str) -> Option<(BucketEntry, RwLockReadGuard<'_, Stripe>)> {
        let buckets = self.buckets.lock();
        let entry = buckets.get(bucket_id)?.clone();
        let stripe = self.stripes.read(entry.stripe);
        drop(buckets);

        Some((entry, stripe))
    }

    /// Find a bucket and lock its stripe for writing
    pub fn lookup_write(&self, bucket_id: &str) -> Option<(BucketEntry, RwLockWriteGuard<'_, Stripe>)> {
        let buckets = self.buckets.lock();
        let entry = buckets.get(bucket_id)?.clone();
        let stripe = self.stripes.write(entry.stripe);
        drop(buckets);

        Some((entry, stripe))
    }

    /// Unregister a bucket that no longer holds any object
    ///
    /// Call without holding the bucket's stripe lock. Leaves the bucket in
    /// place if a concurrent store repopulated it in the meantime.
    pub fn remove_if_empty(&self, bucket_id: &str) -> bool {
        let mut buckets = self.buckets.lock();
        let Some(stripe_index) = buckets.get(bucket_id).map(|entry| entry.stripe) else {
            return false;
        };

        let mut stripe = self.stripes.write(stripe_index);
        if stripe.chain(bucket_id).is_some_and(|chain| !chain.is_empty()) {
            return false;
        }
        stripe.remove_chain(bucket_id);
        buckets.remove(bucket_id);
        true
    }

    fn new_entry(&self, bucket_id: &str) -> BucketEntry {
        BucketEntry {
            file_path: self.bucket_path(bucket_id),
            stripe: self.stripes.index_for(bucket_id),
        }
    }
}
