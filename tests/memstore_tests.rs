//! MemStore and backend selection tests

use std::sync::Arc;
use std::thread;

use objstore::store::{check_identifier, is_valid_identifier, open_file_store};
use objstore::{open_store, BackendKind, Config, MemStore, ObjectStore, StoreError};
use tempfile::TempDir;

// =============================================================================
// MemStore Tests
// =============================================================================

#[test]
fn test_store_retrieve_replace() {
    let store = MemStore::new();

    assert!(!store.store(b"hello", "o1", "b1").unwrap());
    assert_eq!(&store.retrieve("o1", "b1").unwrap().unwrap()[..], b"hello");

    assert!(store.store(b"hello2", "o1", "b1").unwrap());
    assert_eq!(&store.retrieve("o1", "b1").unwrap().unwrap()[..], b"hello2");
}

#[test]
fn test_retrieve_missing() {
    let store = MemStore::new();
    assert!(store.retrieve("o1", "b1").unwrap().is_none());

    store.store(b"x", "o1", "b1").unwrap();
    assert!(store.retrieve("o2", "b1").unwrap().is_none());
}

#[test]
fn test_delete_drops_empty_bucket() {
    let store = MemStore::new();
    store.store(b"a", "o1", "b").unwrap();
    store.store(b"b", "o2", "b").unwrap();
    assert_eq!(store.bucket_count(), 1);

    assert!(store.delete("o1", "b").unwrap());
    assert_eq!(store.bucket_count(), 1);
    assert!(store.delete("o2", "b").unwrap());
    assert_eq!(store.bucket_count(), 0);

    assert!(!store.delete("o2", "b").unwrap());
    assert!(!store.delete("o1", "missing").unwrap());
}

#[test]
fn test_empty_payload() {
    let store = MemStore::new();
    store.store(b"", "o1", "b").unwrap();
    assert_eq!(store.retrieve("o1", "b").unwrap().unwrap().len(), 0);
}

#[test]
fn test_concurrent_access() {
    let store = MemStore::new();

    thread::scope(|s| {
        for t in 0..8 {
            let store = &store;
            s.spawn(move || {
                let bucket = format!("b{}", t % 3);
                for i in 0..100 {
                    let id = format!("t{}-{}", t, i);
                    store.store(id.as_bytes(), &id, &bucket).unwrap();
                }
            });
        }
    });

    assert_eq!(store.bucket_count(), 3);
    assert_eq!(&store.retrieve("t4-99", "b1").unwrap().unwrap()[..], b"t4-99");
}

// =============================================================================
// Backend Selection Tests
// =============================================================================

/// Same observable contract for every backend
fn exercise_backend(store: &dyn ObjectStore) {
    assert!(!store.store(b"a", "o1", "b").unwrap());
    assert!(!store.store(b"bbb", "o2", "b").unwrap());
    assert!(store.store(b"aa", "o1", "b").unwrap());
    assert_eq!(&store.retrieve("o1", "b").unwrap().unwrap()[..], b"aa");
    assert!(store.delete("o1", "b").unwrap());
    assert!(!store.delete("o1", "b").unwrap());
    assert!(store.retrieve("o1", "b").unwrap().is_none());
    assert!(store.delete("o2", "b").unwrap());
    assert!(store.retrieve("o2", "b").unwrap().is_none());
}

#[test]
fn test_open_memory_backend() {
    let store: Arc<dyn ObjectStore> = open_store(&Config::default()).unwrap();
    exercise_backend(store.as_ref());
}

#[test]
fn test_open_file_backend_creates_directory() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("nested").join("data");
    let config = Config::builder()
        .backend(BackendKind::File)
        .data_dir(&data_dir)
        .build();

    let store = open_store(&config).unwrap();
    assert!(data_dir.is_dir());
    exercise_backend(store.as_ref());
    assert!(!data_dir.join("b.dat").exists());
}

#[test]
fn test_open_file_store_uses_stripe_count() {
    let dir = TempDir::new().unwrap();
    let config = Config::builder()
        .backend(BackendKind::File)
        .data_dir(dir.path())
        .stripe_count(7)
        .build();

    let store = open_file_store(&config).unwrap();
    assert_eq!(store.stripe_count(), 7);
    assert_eq!(store.root(), dir.path());
}

#[test]
fn test_open_rejects_invalid_config() {
    let config = Config::builder().stripe_count(0).build();
    assert!(matches!(open_store(&config), Err(StoreError::Config(_))));
}

// =============================================================================
// Identifier Tests
// =============================================================================

#[test]
fn test_identifier_charset() {
    for good in ["a", "abc", "a-b_c", "0", "bucket-01", "___", "-"] {
        assert!(is_valid_identifier(good), "{:?} should be valid", good);
        assert!(check_identifier(good).is_ok());
    }
    for bad in ["", "A", "a b", "a\nb", "a.b", "a/b", "é", "a\0"] {
        assert!(!is_valid_identifier(bad), "{:?} should be invalid", bad);
        assert!(matches!(
            check_identifier(bad),
            Err(StoreError::InvalidIdentifier(_))
        ));
    }
}
