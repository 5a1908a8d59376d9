//! FileStore Tests
//!
//! These tests verify:
//! - Byte-exact bucket files after store, replace and delete
//! - Offset shifts of physically later objects on resize and delete
//! - Bucket lifecycle (file removed with its last object)
//! - Identifier revalidation inside the engine
//! - Concurrent access to one bucket and to many buckets

use std::fs;
use std::path::Path;
use std::thread;

use objstore::store::file::ObjectLayout;
use objstore::{FileStore, ObjectStore, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, FileStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::open(temp_dir.path()).unwrap();
    (temp_dir, store)
}

fn file_bytes(store: &FileStore, bucket: &str) -> Vec<u8> {
    fs::read(store.bucket_path(bucket)).unwrap()
}

fn layout_triples(layout: &[ObjectLayout]) -> Vec<(String, u64, u64, u64)> {
    layout
        .iter()
        .map(|l| (l.object_id.clone(), l.offset, l.header_size, l.payload_size))
        .collect()
}

fn temp_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .path()
                .extension()
                .map_or(false, |ext| ext == "tmp")
        })
        .count()
}

// =============================================================================
// Concrete Scenarios
// =============================================================================

#[test]
fn test_store_new_object_writes_record() {
    let (_dir, store) = setup_temp_store();

    let replaced = store.store(b"hello", "o1", "b1").unwrap();
    assert!(!replaced);
    assert_eq!(file_bytes(&store, "b1"), b"o1 5 hello\n");
}

#[test]
fn test_store_existing_object_replaces_record() {
    let (_dir, store) = setup_temp_store();
    store.store(b"hello", "o1", "b1").unwrap();

    let replaced = store.store(b"hello2", "o1", "b1").unwrap();
    assert!(replaced);
    assert_eq!(file_bytes(&store, "b1"), b"o1 6 hello2\n");
    assert_eq!(store.retrieve("o1", "b1").unwrap().unwrap(), &b"hello2"[..]);
}

#[test]
fn test_delete_first_object_shifts_second() {
    let (_dir, store) = setup_temp_store();
    store.store(b"a", "o1", "b").unwrap();
    store.store(b"bbb", "o2", "b").unwrap();

    assert!(store.delete("o1", "b").unwrap());
    assert_eq!(file_bytes(&store, "b"), b"o2 3 bbb\n");

    let layout = store.bucket_layout("b").unwrap();
    assert_eq!(layout.len(), 1);
    assert_eq!(layout[0].object_id, "o2");
    assert_eq!(layout[0].offset, 0);
}

#[test]
fn test_delete_last_object_removes_bucket() {
    let (_dir, store) = setup_temp_store();
    store.store(b"a", "o1", "b").unwrap();
    store.store(b"bbb", "o2", "b").unwrap();
    store.delete("o1", "b").unwrap();

    assert!(store.delete("o2", "b").unwrap());
    assert!(!store.bucket_path("b").exists());
    assert_eq!(store.bucket_count(), 0);
    assert!(store.bucket_layout("b").is_none());
    assert!(store.retrieve("o2", "b").unwrap().is_none());
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_round_trip_various_payloads() {
    let (_dir, store) = setup_temp_store();
    let all_bytes: Vec<u8> = (0..=255u8).collect();
    let payloads: [(&str, &[u8]); 5] = [
        ("empty", &b""[..]),
        ("space", &b" "[..]),
        ("newline", &b"\n"[..]),
        ("mixed", &b"o9 3 abc\n fake record \n"[..]),
        ("binary", &all_bytes[..]),
    ];

    for (id, payload) in &payloads {
        store.store(payload, id, "rt").unwrap();
    }
    for (id, payload) in &payloads {
        let got = store.retrieve(id, "rt").unwrap().unwrap();
        assert_eq!(&got[..], *payload, "payload mismatch for {}", id);
    }
}

#[test]
fn test_retrieve_missing() {
    let (_dir, store) = setup_temp_store();
    assert!(store.retrieve("o1", "nobucket").unwrap().is_none());

    store.store(b"x", "o1", "b").unwrap();
    assert!(store.retrieve("o2", "b").unwrap().is_none());
}

#[test]
fn test_large_payload() {
    let (_dir, store) = setup_temp_store();
    let payload: Vec<u8> = (0..1_000_000u32).map(|i| (i % 253) as u8).collect();

    store.store(&payload, "big", "b").unwrap();
    store.store(b"after", "small", "b").unwrap();

    assert_eq!(&store.retrieve("big", "b").unwrap().unwrap()[..], &payload[..]);
    assert_eq!(&store.retrieve("small", "b").unwrap().unwrap()[..], b"after");
}

// =============================================================================
// Offset Shift Tests
// =============================================================================

#[test]
fn test_replace_same_size_keeps_offsets() {
    let (_dir, store) = setup_temp_store();
    store.store(b"aaa", "o1", "b").unwrap();
    store.store(b"bbb", "o2", "b").unwrap();
    store.store(b"ccc", "o3", "b").unwrap();
    let before = store.bucket_layout("b").unwrap();

    store.store(b"xyz", "o2", "b").unwrap();

    assert_eq!(store.bucket_layout("b").unwrap(), before);
    assert_eq!(file_bytes(&store, "b"), b"o1 3 aaa\no2 3 xyz\no3 3 ccc\n");
}

#[test]
fn test_replace_different_size_shifts_later_objects() {
    let (_dir, store) = setup_temp_store();
    store.store(b"aaa", "o1", "b").unwrap();
    store.store(b"bbb", "o2", "b").unwrap();
    store.store(b"ccc", "o3", "b").unwrap();
    store.store(b"ddd", "o4", "b").unwrap();
    let before = store.bucket_layout("b").unwrap();

    // "o2 3 bbb\n" (9 bytes) becomes "o2 12 bbbbbbbbbbbb\n" (19 bytes)
    store.store(b"bbbbbbbbbbbb", "o2", "b").unwrap();
    let after = store.bucket_layout("b").unwrap();

    assert_eq!(after[0], before[0]);
    assert_eq!(after[1].offset, before[1].offset);
    assert_eq!(after[1].header_size, 5);
    assert_eq!(after[1].payload_size, 12);
    assert_eq!(after[2].offset, before[2].offset + 10);
    assert_eq!(after[3].offset, before[3].offset + 10);

    for (id, payload) in [("o1", "aaa"), ("o2", "bbbbbbbbbbbb"), ("o3", "ccc"), ("o4", "ddd")] {
        assert_eq!(&store.retrieve(id, "b").unwrap().unwrap()[..], payload.as_bytes());
    }
}

#[test]
fn test_delete_middle_shifts_later_objects() {
    let (_dir, store) = setup_temp_store();
    store.store(b"first", "o1", "b").unwrap();
    store.store(b"second", "o2", "b").unwrap();
    store.store(b"third", "o3", "b").unwrap();

    store.delete("o2", "b").unwrap();

    assert_eq!(file_bytes(&store, "b"), b"o1 5 first\no3 5 third\n");
    assert_eq!(
        layout_triples(&store.bucket_layout("b").unwrap()),
        vec![("o1".into(), 0, 4, 5), ("o3".into(), 11, 4, 5)]
    );
}

#[test]
fn test_layout_matches_file_after_mixed_operations() {
    let (_dir, store) = setup_temp_store();
    for i in 0..20 {
        store.store(format!("payload-{}", i).as_bytes(), &format!("o{}", i), "mix").unwrap();
    }
    for i in (0..20).step_by(3) {
        store.delete(&format!("o{}", i), "mix").unwrap();
    }
    for i in (1..20).step_by(4) {
        store.store(&vec![b'z'; i * 7], &format!("o{}", i), "mix").unwrap();
    }

    let layout = store.bucket_layout("mix").unwrap();
    let file_len = file_bytes(&store, "mix").len() as u64;
    let mut expected = 0;
    for entry in &layout {
        assert_eq!(entry.offset, expected);
        expected += entry.header_size + entry.payload_size + 2;
    }
    assert_eq!(expected, file_len);
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_is_idempotent() {
    let (_dir, store) = setup_temp_store();
    store.store(b"x", "o1", "b").unwrap();
    store.store(b"y", "o2", "b").unwrap();

    assert!(store.delete("o1", "b").unwrap());
    assert!(!store.delete("o1", "b").unwrap());
}

#[test]
fn test_delete_missing_bucket() {
    let (_dir, store) = setup_temp_store();
    assert!(!store.delete("o1", "nobucket").unwrap());
}

#[test]
fn test_bucket_recreated_after_removal() {
    let (_dir, store) = setup_temp_store();
    store.store(b"x", "o1", "b").unwrap();
    store.delete("o1", "b").unwrap();
    assert!(!store.bucket_path("b").exists());

    assert!(!store.store(b"again", "o1", "b").unwrap());
    assert_eq!(file_bytes(&store, "b"), b"o1 5 again\n");
    assert_eq!(store.bucket_count(), 1);
}

#[test]
fn test_no_temp_files_left_behind() {
    let (dir, store) = setup_temp_store();
    store.store(b"x", "o1", "b").unwrap();
    store.store(b"yy", "o2", "b").unwrap();
    store.store(b"zzz", "o1", "b").unwrap();
    store.delete("o2", "b").unwrap();

    assert_eq!(temp_files(dir.path()), 0);
}

#[test]
fn test_bucket_file_naming() {
    let (dir, store) = setup_temp_store();
    store.store(b"x", "o1", "my-bucket_1").unwrap();

    assert_eq!(store.bucket_path("my-bucket_1"), dir.path().join("my-bucket_1.dat"));
    assert!(dir.path().join("my-bucket_1.dat").is_file());
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_failed_store_leaves_metadata_untouched() {
    let (dir, store) = setup_temp_store();
    store.store(b"a", "o1", "b").unwrap();
    store.store(b"bb", "o2", "b").unwrap();
    let before = store.bucket_layout("b").unwrap();

    fs::remove_file(store.bucket_path("b")).unwrap();

    assert!(matches!(store.store(b"ccc", "o3", "b"), Err(StoreError::Io(_))));
    assert!(matches!(store.store(b"zz", "o1", "b"), Err(StoreError::Io(_))));
    assert_eq!(store.bucket_layout("b").unwrap(), before);
    assert_eq!(store.bucket_count(), 1);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_failed_delete_leaves_metadata_untouched() {
    let (dir, store) = setup_temp_store();
    store.store(b"a", "o1", "b").unwrap();
    store.store(b"bb", "o2", "b").unwrap();
    let before = store.bucket_layout("b").unwrap();

    fs::remove_file(store.bucket_path("b")).unwrap();

    assert!(matches!(store.delete("o1", "b"), Err(StoreError::Io(_))));
    assert_eq!(store.bucket_layout("b").unwrap(), before);
    assert_eq!(temp_files(dir.path()), 0);
}

#[test]
fn test_failed_store_keeps_existing_file() {
    let (dir, store) = setup_temp_store();
    store.store(b"a", "o1", "b").unwrap();
    store.store(b"bb", "o2", "b").unwrap();
    let bytes = file_bytes(&store, "b");

    // Swap the file for a shorter one: the append path must not commit a
    // rewrite built from fewer bytes than the chain describes
    fs::write(store.bucket_path("b"), b"o1 1 a\n").unwrap();
    assert!(store.store(b"ccc", "o3", "b").is_err());
    assert_eq!(file_bytes(&store, "b"), b"o1 1 a\n");
    assert_eq!(temp_files(dir.path()), 0);

    fs::write(store.bucket_path("b"), &bytes).unwrap();
    assert!(!store.store(b"ccc", "o3", "b").unwrap());
    assert_eq!(file_bytes(&store, "b"), b"o1 1 a\no2 2 bb\no3 3 ccc\n");
}

#[test]
fn test_failed_first_store_unregisters_bucket() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("data");
    fs::create_dir(&root).unwrap();
    let store = FileStore::open(&root).unwrap();
    assert_eq!(store.root(), root.as_path());

    fs::remove_dir(&root).unwrap();

    assert!(matches!(store.store(b"x", "o1", "fresh"), Err(StoreError::Io(_))));
    assert_eq!(store.bucket_count(), 0);
    assert!(store.bucket_layout("fresh").is_none());
    assert!(store.retrieve("o1", "fresh").unwrap().is_none());
}

// =============================================================================
// Identifier Validation Tests
// =============================================================================

#[test]
fn test_invalid_identifiers_rejected() {
    let (dir, store) = setup_temp_store();

    for bad in ["", "has space", "new\nline", "Upper", "dot.dot", "slash/x"] {
        assert!(matches!(
            store.store(b"x", bad, "b"),
            Err(StoreError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            store.store(b"x", "o", bad),
            Err(StoreError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            store.retrieve(bad, "b"),
            Err(StoreError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            store.delete("o", bad),
            Err(StoreError::InvalidIdentifier(_))
        ));
    }

    assert_eq!(store.bucket_count(), 0);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_same_bucket() {
    let (_dir, store) = setup_temp_store();

    thread::scope(|s| {
        for t in 0..8 {
            let store = &store;
            s.spawn(move || {
                for i in 0..25 {
                    let id = format!("t{}-o{}", t, i);
                    store.store(id.as_bytes(), &id, "shared").unwrap();
                }
            });
        }
    });

    let layout = store.bucket_layout("shared").unwrap();
    assert_eq!(layout.len(), 200);
    for t in 0..8 {
        for i in 0..25 {
            let id = format!("t{}-o{}", t, i);
            assert_eq!(&store.retrieve(&id, "shared").unwrap().unwrap()[..], id.as_bytes());
        }
    }
}

#[test]
fn test_concurrent_buckets_with_few_stripes() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::open_with_stripes(temp_dir.path(), 2).unwrap();
    assert_eq!(store.stripe_count(), 2);

    thread::scope(|s| {
        for t in 0..6 {
            let store = &store;
            s.spawn(move || {
                let bucket = format!("bucket-{}", t);
                for i in 0..20 {
                    store.store(format!("v{}", i).as_bytes(), "obj", &bucket).unwrap();
                    store.store(b"keep", &format!("k{}", i), &bucket).unwrap();
                    store.delete(&format!("k{}", i), &bucket).unwrap();
                }
            });
        }
    });

    assert_eq!(store.bucket_count(), 6);
    for t in 0..6 {
        let bucket = format!("bucket-{}", t);
        assert_eq!(&store.retrieve("obj", &bucket).unwrap().unwrap()[..], b"v19");
        assert_eq!(file_bytes(&store, &bucket), b"obj 3 v19\n");
    }
}

#[test]
fn test_concurrent_create_and_remove_bucket() {
    let (_dir, store) = setup_temp_store();

    thread::scope(|s| {
        for t in 0..4 {
            let store = &store;
            s.spawn(move || {
                let id = format!("o{}", t);
                for _ in 0..50 {
                    store.store(b"x", &id, "churn").unwrap();
                    assert!(store.delete(&id, "churn").unwrap());
                }
            });
        }
    });

    assert_eq!(store.bucket_count(), 0);
    assert!(!store.bucket_path("churn").exists());
}

#[test]
fn test_readers_see_committed_payloads() {
    let (_dir, store) = setup_temp_store();
    store.store(b"aaaa", "obj", "b").unwrap();
    store.store(b"neighbour", "other", "b").unwrap();

    thread::scope(|s| {
        let store = &store;
        s.spawn(move || {
            for i in 0..100 {
                let payload = if i % 2 == 0 { &b"bbbbbbbbbbbbbbbb"[..] } else { &b"aaaa"[..] };
                store.store(payload, "obj", "b").unwrap();
            }
        });
        for _ in 0..2 {
            s.spawn(move || {
                for _ in 0..200 {
                    let got = store.retrieve("obj", "b").unwrap().unwrap();
                    assert!(&got[..] == b"aaaa" || &got[..] == b"bbbbbbbbbbbbbbbb");
                    let other = store.retrieve("other", "b").unwrap().unwrap();
                    assert_eq!(&other[..], b"neighbour");
                }
            });
        }
    });
}
