//! Bootstrap Loader
//!
//! Rebuilds every bucket's metadata chain from the bytes on disk before the
//! store serves any request.
//!
//! On startup:
//! 1. Check the storage directory exists
//! 2. Remove temporary files left by rewrites that never reached the rename
//! 3. Parse each `<bucket>.dat` record by record, from offset 0
//! 4. Remove bucket files holding no record
//!
//! A malformed record fails the whole load: a corrupt bucket is never
//! silently dropped.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use crate::error::{Result, StoreError};
use crate::store::is_valid_identifier;

use super::chain::ObjectChain;
use super::record::RecordReader;
use super::{BUCKET_EXTENSION, TEMP_EXTENSION};

/// What the loader found in the storage directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Buckets registered with at least one object
    pub buckets_loaded: usize,

    /// Objects across all loaded buckets
    pub objects_loaded: usize,

    /// Bucket files deleted because they held no record
    pub empty_files_removed: usize,

    /// Temporary rewrite files deleted
    pub temp_files_removed: usize,

    /// Files left alone because their name is not a bucket id
    pub files_ignored: usize,
}

/// Parse every bucket file under `root`
pub fn load_buckets(root: &Path) -> Result<(Vec<(String, ObjectChain)>, LoadReport)> {
    check_store_dir(root)?;

    let mut report = LoadReport::default();
    let mut buckets = Vec::new();

    for dir_entry in fs::read_dir(root)? {
        let path = dir_entry?.path();
        if !path.is_file() {
            continue;
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            Some(TEMP_EXTENSION) => {
                fs::remove_file(&path)?;
                report.temp_files_removed += 1;
            }
            Some(BUCKET_EXTENSION) => {
                let bucket_id = match path.file_stem().and_then(|stem| stem.to_str()) {
                    Some(stem) if is_valid_identifier(stem) => stem.to_string(),
                    _ => {
                        report.files_ignored += 1;
                        continue;
                    }
                };

                let chain = load_chain(&path)?;
                if chain.is_empty() {
                    fs::remove_file(&path)?;
                    report.empty_files_removed += 1;
                    continue;
                }

                report.buckets_loaded += 1;
                report.objects_loaded += chain.len();
                buckets.push((bucket_id, chain));
            }
            _ => report.files_ignored += 1,
        }
    }

    Ok((buckets, report))
}

/// Rebuild one bucket's chain by reading its records in file order
pub fn load_chain(path: &Path) -> Result<ObjectChain> {
    let file = File::open(path)?;
    let mut reader = RecordReader::new(BufReader::new(file));
    let mut chain = ObjectChain::new();

    while let Some(header) = reader.next_header().map_err(|e| in_file(path, e))? {
        if chain.contains(&header.object_id) {
            return Err(StoreError::Format(format!(
                "{}: duplicate object {:?} at offset {}",
                path.display(),
                header.object_id,
                header.offset
            )));
        }
        let offset = chain.push_back(&header.object_id, header.size);
        debug_assert_eq!(offset, header.offset);
    }

    Ok(chain)
}

fn check_store_dir(root: &Path) -> Result<()> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(StoreError::Config(format!(
            "store path {} is not a directory",
            root.display()
        ))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::Config(format!(
            "store directory {} does not exist",
            root.display()
        ))),
        Err(e) => Err(StoreError::Config(format!(
            "cannot access store directory {}: {}",
            root.display(),
            e
        ))),
    }
}

fn in_file(path: &Path, err: StoreError) -> StoreError {
    match err {
        StoreError::Format(reason) => StoreError::Format(format!("{}: {}", path.display(), reason)),
        other => other,
    }
}
