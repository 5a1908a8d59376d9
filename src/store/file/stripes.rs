//! Stripe Lock Manager
//!
//! A fixed array of RwLocks shared by all buckets. A bucket is mapped to
//! one stripe by a CRC32 of its identifier, and that stripe's lock guards
//! both the bucket's file and its metadata chain, so the number of locks
//! (and of bucket files open at once) does not grow with the bucket count.
//! Buckets that hash to the same stripe serialize against each other.

use std::collections::HashMap;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::chain::ObjectChain;

/// Metadata of every bucket mapped to one stripe
#[derive(Debug, Default)]
pub struct Stripe {
    chains: HashMap<String, ObjectChain>,
}

impl Stripe {
    pub fn chain(&self, bucket_id: &str) -> Option<&ObjectChain> {
        self.chains.get(bucket_id)
    }

    pub fn chain_mut(&mut self, bucket_id: &str) -> Option<&mut ObjectChain> {
        self.chains.get_mut(bucket_id)
    }

    /// The bucket's chain, created empty if missing
    pub fn chain_or_default(&mut self, bucket_id: &str) -> &mut ObjectChain {
        self.chains.entry(bucket_id.to_string()).or_default()
    }

    pub fn insert_chain(&mut self, bucket_id: String, chain: ObjectChain) {
        self.chains.insert(bucket_id, chain);
    }

    pub fn remove_chain(&mut self, bucket_id: &str) -> Option<ObjectChain> {
        self.chains.remove(bucket_id)
    }
}

/// Fixed-size array of stripe locks
#[derive(Debug)]
pub struct StripeLocks {
    stripes: Box<[RwLock<Stripe>]>,
}

impl StripeLocks {
    /// Create `count` stripes (at least one)
    pub fn new(count: usize) -> Self {
        let stripes = (0..count.max(1))
            .map(|_| RwLock::new(Stripe::default()))
            .collect();
        Self { stripes }
    }

    pub fn len(&self) -> usize {
        self.stripes.len()
    }

    /// Stripe a bucket is mapped to
    pub fn index_for(&self, bucket_id: &str) -> usize {
        stripe_index(bucket_id, self.len())
    }

    /// Shared access to one stripe
    pub fn read(&self, index: usize) -> RwLockReadGuard<'_, Stripe> {
        self.stripes[index].read()
    }

    /// Exclusive access to one stripe
    pub fn write(&self, index: usize) -> RwLockWriteGuard<'_, Stripe> {
        self.stripes[index].write()
    }
}

/// Stable stripe index of `bucket_id` among `count` stripes
pub fn stripe_index(bucket_id: &str, count: usize) -> usize {
    crc32fast::hash(bucket_id.as_bytes()) as usize % count.max(1)
}
