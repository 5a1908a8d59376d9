//! Configuration tests

use std::fs;
use std::path::PathBuf;

use objstore::config::{ConfigBuilder, DEFAULT_MAX_OBJECT_SIZE, DEFAULT_STRIPE_COUNT};
use objstore::{BackendKind, Config, StoreError};
use tempfile::TempDir;

#[test]
fn test_defaults() {
    let config = Config::default();

    assert_eq!(config.data_dir, PathBuf::from("./data"));
    assert_eq!(config.backend, BackendKind::Memory);
    assert_eq!(config.stripe_count, DEFAULT_STRIPE_COUNT);
    assert_eq!(config.stripe_count, 100);
    assert_eq!(config.listen_addr, "0.0.0.0:8080");
    assert_eq!(config.max_connections, 1024);
    assert_eq!(config.worker_threads, 8);
    assert_eq!(config.read_timeout_ms, 30_000);
    assert_eq!(config.write_timeout_ms, 30_000);
    assert_eq!(config.max_object_size, DEFAULT_MAX_OBJECT_SIZE);
    assert_eq!(config.max_object_size, 10 * 1024 * 1024);
    assert!(config.validate().is_ok());
}

#[test]
fn test_builder_sets_every_field() {
    let config = Config::builder()
        .data_dir("/var/lib/objstore")
        .backend(BackendKind::File)
        .stripe_count(16)
        .listen_addr("127.0.0.1:9000")
        .max_connections(10)
        .worker_threads(2)
        .read_timeout_ms(100)
        .write_timeout_ms(200)
        .max_object_size(4096)
        .build();

    assert_eq!(config.data_dir, PathBuf::from("/var/lib/objstore"));
    assert_eq!(config.backend, BackendKind::File);
    assert_eq!(config.stripe_count, 16);
    assert_eq!(config.listen_addr, "127.0.0.1:9000");
    assert_eq!(config.max_connections, 10);
    assert_eq!(config.worker_threads, 2);
    assert_eq!(config.read_timeout_ms, 100);
    assert_eq!(config.write_timeout_ms, 200);
    assert_eq!(config.max_object_size, 4096);
}

#[test]
fn test_builder_from_existing_config() {
    let base = Config::builder().stripe_count(3).build();
    let config = ConfigBuilder::from_config(base).worker_threads(1).build();

    assert_eq!(config.stripe_count, 3);
    assert_eq!(config.worker_threads, 1);
}

#[test]
fn test_toml_overlays_defaults() {
    let config = Config::from_toml_str(
        r#"
        backend = "file"
        data_dir = "/tmp/objects"
        stripe_count = 32
        max_object_size = 1048576
        "#,
    )
    .unwrap();

    assert_eq!(config.backend, BackendKind::File);
    assert_eq!(config.data_dir, PathBuf::from("/tmp/objects"));
    assert_eq!(config.stripe_count, 32);
    assert_eq!(config.max_object_size, 1 << 20);
    // Untouched keys keep their defaults
    assert_eq!(config.listen_addr, "0.0.0.0:8080");
    assert_eq!(config.worker_threads, 8);
}

#[test]
fn test_toml_empty_is_default() {
    let config = Config::from_toml_str("").unwrap();
    assert_eq!(config.backend, BackendKind::Memory);
    assert_eq!(config.stripe_count, 100);
}

#[test]
fn test_toml_rejects_unknown_key() {
    assert!(matches!(
        Config::from_toml_str("stripes = 4"),
        Err(StoreError::Config(_))
    ));
}

#[test]
fn test_toml_rejects_unknown_backend() {
    assert!(matches!(
        Config::from_toml_str(r#"backend = "s3""#),
        Err(StoreError::Config(_))
    ));
}

#[test]
fn test_toml_rejects_invalid_values() {
    assert!(matches!(
        Config::from_toml_str("stripe_count = 0"),
        Err(StoreError::Config(_))
    ));
    assert!(matches!(
        Config::from_toml_str("worker_threads = 0"),
        Err(StoreError::Config(_))
    ));
}

#[test]
fn test_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("objstore.toml");
    fs::write(&path, "listen_addr = \"127.0.0.1:7000\"\nread_timeout_ms = 5\n").unwrap();

    let config = Config::from_toml_file(&path).unwrap();
    assert_eq!(config.listen_addr, "127.0.0.1:7000");
    assert_eq!(config.read_timeout_ms, 5);
}

#[test]
fn test_toml_file_missing() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        Config::from_toml_file(&dir.path().join("nope.toml")),
        Err(StoreError::Config(_))
    ));
}

#[test]
fn test_validate_rejects_zero_counts() {
    assert!(Config::builder().stripe_count(0).build().validate().is_err());
    assert!(Config::builder().worker_threads(0).build().validate().is_err());
    assert!(Config::builder().max_connections(0).build().validate().is_err());
}
