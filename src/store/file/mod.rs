//! File Backend
//!
//! Persists each bucket as one record file and keeps an in-memory chain of
//! record offsets for direct reads.
//!
//! ## Mutation Protocol
//! Every store/delete runs under the bucket's stripe lock and:
//! 1. writes the new file content into a temporary file in the same directory
//!    (old bytes copied verbatim, the changed record written or skipped)
//! 2. syncs it and renames it over `<bucket>.dat`
//! 3. only then updates the metadata chain
//!
//! A failure before the rename leaves both the bucket file and the chain
//! untouched; the unrenamed temporary file is removed on drop.
//!
//! ## Directory Layout
//! ```text
//! {root}/
//!   ├── <bucket>.dat          (records: "<id> <len> <payload>\n" ...)
//!   └── <bucket>_<rand>.tmp   (only while a rewrite is in flight)
//! ```

mod bootstrap;
pub mod chain;
pub mod record;
mod registry;
mod stripes;

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::NamedTempFile;

use crate::config::{Config, DEFAULT_STRIPE_COUNT};
use crate::error::Result;

use super::{check_identifier, ObjectStore};

pub use bootstrap::{load_buckets, load_chain, LoadReport};
pub use chain::{ObjectChain, ObjectEntry, ObjectLayout};
pub use record::RecordSize;
pub use stripes::stripe_index;

use registry::{BucketEntry, BucketRegistry};
use stripes::Stripe;

/// Extension of bucket record files
pub const BUCKET_EXTENSION: &str = "dat";

/// Extension of in-flight rewrite files
pub const TEMP_EXTENSION: &str = "tmp";

/// Object store backed by one record file per bucket
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    registry: BucketRegistry,
    report: LoadReport,
}

impl FileStore {
    /// Open the store in `root` with the default stripe count
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_stripes(root, DEFAULT_STRIPE_COUNT)
    }

    /// Open the store using the data directory and stripe count of `config`
    pub fn open_with_config(config: &Config) -> Result<Self> {
        Self::open_with_stripes(&config.data_dir, config.stripe_count)
    }

    /// Open the store in `root`, rebuilding every bucket from disk
    ///
    /// `root` must already exist.
    pub fn open_with_stripes(root: impl AsRef<Path>, stripe_count: usize) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let (buckets, report) = load_buckets(&root)?;
        let registry = BucketRegistry::with_buckets(&root, stripe_count, buckets);

        Ok(Self {
            root,
            registry,
            report,
        })
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Storage directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// What was found on disk when the store was opened
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// Number of buckets currently registered
    pub fn bucket_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of stripe locks buckets are spread over
    pub fn stripe_count(&self) -> usize {
        self.registry.stripe_count()
    }

    /// File `bucket_id` is persisted to (whether or not it exists)
    pub fn bucket_path(&self, bucket_id: &str) -> PathBuf {
        self.registry.bucket_path(bucket_id)
    }

    /// Placement of every record in the bucket, in file order
    pub fn bucket_layout(&self, bucket_id: &str) -> Option<Vec<ObjectLayout>> {
        let (_, stripe) = self.registry.lookup_read(bucket_id)?;
        stripe.chain(bucket_id).map(ObjectChain::layout)
    }

    // =========================================================================
    // Rewrite Engine
    // =========================================================================

    /// Store with the bucket's stripe held for writing
    fn store_locked(
        &self,
        bucket: &BucketEntry,
        stripe: &mut Stripe,
        bucket_id: &str,
        object_id: &str,
        payload: &[u8],
    ) -> Result<bool> {
        let (existing, end_offset) = match stripe.chain(bucket_id) {
            Some(chain) => (chain.get(object_id).copied(), chain.end_offset()),
            None => (None, 0),
        };

        let mut tmp = self.temp_file(bucket_id)?;
        let size = {
            let mut out = BufWriter::new(tmp.as_file_mut());
            let size = match &existing {
                Some(old) => rewrite_bucket(&bucket.file_path, &mut out, old, |w| {
                    record::write_record(w, object_id, payload)
                })?,
                None => {
                    if end_offset > 0 {
                        let mut src = BufReader::new(File::open(&bucket.file_path)?);
                        copy_exact(&mut src, &mut out, end_offset)?;
                    }
                    record::write_record(&mut out, object_id, payload)?
                }
            };
            out.flush()?;
            size
        };
        self.commit(tmp, &bucket.file_path)?;

        let chain = stripe.chain_or_default(bucket_id);
        match existing {
            Some(_) => {
                chain.resize(object_id, size);
            }
            None => {
                chain.push_back(object_id, size);
            }
        }

        Ok(existing.is_some())
    }

    /// Delete with the bucket's stripe held for writing. Returns
    /// `Some(true)` if the bucket was emptied.
    fn delete_locked(
        &self,
        bucket: &BucketEntry,
        stripe: &mut Stripe,
        bucket_id: &str,
        object_id: &str,
    ) -> Result<Option<bool>> {
        let Some(chain) = stripe.chain(bucket_id) else {
            return Ok(None);
        };
        let Some(old) = chain.get(object_id).copied() else {
            return Ok(None);
        };

        // Last object: the whole file goes, no rewrite needed
        if chain.len() == 1 {
            fs::remove_file(&bucket.file_path)?;
            stripe.remove_chain(bucket_id);
            return Ok(Some(true));
        }

        let mut tmp = self.temp_file(bucket_id)?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            rewrite_bucket(&bucket.file_path, &mut out, &old, |_| Ok(()))?;
            out.flush()?;
        }
        self.commit(tmp, &bucket.file_path)?;

        if let Some(chain) = stripe.chain_mut(bucket_id) {
            chain.unlink(object_id);
        }
        Ok(Some(false))
    }

    /// Fresh temporary file next to the bucket files
    fn temp_file(&self, bucket_id: &str) -> Result<NamedTempFile> {
        let prefix = format!("{}_", bucket_id);
        let suffix = format!(".{}", TEMP_EXTENSION);
        let tmp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(&self.root)?;
        Ok(tmp)
    }

    /// Make the temporary file durable and atomically move it over `path`
    fn commit(&self, tmp: NamedTempFile, path: &Path) -> Result<()> {
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;

        // Sync the directory so the rename itself survives a crash
        if let Ok(dir) = File::open(&self.root) {
            // The rename has already committed; a failed directory sync is not an error
            let _ = dir.sync_all();
        }
        Ok(())
    }
}

impl ObjectStore for FileStore {
    fn store(&self, payload: &[u8], object_id: &str, bucket_id: &str) -> Result<bool> {
        check_identifier(bucket_id)?;
        check_identifier(object_id)?;

        let (bucket, created, mut stripe) = self.registry.resolve_or_create(bucket_id);
        let result = self.store_locked(&bucket, &mut stripe, bucket_id, object_id, payload);
        drop(stripe);

        if result.is_err() && created {
            self.registry.remove_if_empty(bucket_id);
        }
        result
    }

    fn retrieve(&self, object_id: &str, bucket_id: &str) -> Result<Option<Bytes>> {
        check_identifier(bucket_id)?;
        check_identifier(object_id)?;

        let Some((bucket, stripe)) = self.registry.lookup_read(bucket_id) else {
            return Ok(None);
        };
        let Some(entry) = stripe
            .chain(bucket_id)
            .and_then(|chain| chain.get(object_id))
            .copied()
        else {
            return Ok(None);
        };

        let mut file = File::open(&bucket.file_path)?;
        file.seek(SeekFrom::Start(entry.payload_offset()))?;
        let mut payload = vec![0u8; entry.payload_size as usize];
        file.read_exact(&mut payload)?;
        drop(stripe);

        Ok(Some(Bytes::from(payload)))
    }

    fn delete(&self, object_id: &str, bucket_id: &str) -> Result<bool> {
        check_identifier(bucket_id)?;
        check_identifier(object_id)?;

        let Some((bucket, mut stripe)) = self.registry.lookup_write(bucket_id) else {
            return Ok(false);
        };
        let outcome = self.delete_locked(&bucket, &mut stripe, bucket_id, object_id)?;
        drop(stripe);

        match outcome {
            None => Ok(false),
            Some(emptied) => {
                if emptied {
                    self.registry.remove_if_empty(bucket_id);
                }
                Ok(true)
            }
        }
    }
}

// =============================================================================
// Private Helpers
// =============================================================================

/// Copy the bucket file to `out`, letting `replace` write whatever takes
/// the place of the record at `old`
fn rewrite_bucket<W, T, F>(src_path: &Path, out: &mut W, old: &ObjectEntry, replace: F) -> Result<T>
where
    W: Write,
    F: FnOnce(&mut W) -> Result<T>,
{
    let mut src = BufReader::new(File::open(src_path)?);

    copy_exact(&mut src, out, old.offset)?;
    let written = replace(out)?;

    src.seek(SeekFrom::Start(old.end_offset()))?;
    io::copy(&mut src, out)?;

    Ok(written)
}

/// Copy exactly `len` bytes from `src` to `dst`
fn copy_exact<R: Read, W: Write>(src: &mut R, dst: &mut W, len: u64) -> Result<()> {
    let copied = io::copy(&mut src.by_ref().take(len), dst)?;
    if copied < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("bucket file ended after {} of {} bytes", copied, len),
        )
        .into());
    }
    Ok(())
}
