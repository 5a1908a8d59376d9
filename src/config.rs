//! Configuration for objstore
//!
//! Centralized configuration with sensible defaults, a builder, and an
//! optional TOML file overlay.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, StoreError};

/// Default number of stripe locks guarding bucket files.
pub const DEFAULT_STRIPE_COUNT: usize = 100;

/// Default maximum size of a single object (10 MiB)
pub const DEFAULT_MAX_OBJECT_SIZE: usize = 10 << 20;

/// Main configuration for an objstore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding bucket files when the file backend is selected.
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── <bucket>.dat         (one record file per bucket)
    ///     └── <bucket>_<rand>.tmp  (rewrite in progress, removed at startup)
    pub data_dir: PathBuf,

    /// Which storage backend serves requests
    pub backend: BackendKind,

    /// Number of stripe locks shared by all buckets.
    ///
    /// More stripes let more distinct buckets be mutated in parallel, at the
    /// cost of more lock memory and up to two open files per stripe at any
    /// time. Fewer stripes bound those resources but make unrelated buckets
    /// that hash to the same stripe wait on each other.
    pub stripe_count: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max accepted connections waiting for a worker
    pub max_connections: usize,

    /// Number of connection worker threads
    pub worker_threads: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,

    /// Largest object accepted by a Store request (bytes)
    pub max_object_size: usize,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Objects live in process memory and vanish on exit
    Memory,

    /// Objects are persisted as one record file per bucket
    File,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            backend: BackendKind::Memory,
            stripe_count: DEFAULT_STRIPE_COUNT,
            listen_addr: "0.0.0.0:8080".to_string(),
            max_connections: 1024,
            worker_threads: 8,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a TOML configuration file on top of the defaults
    ///
    /// Keys missing from the file keep their default value; unknown keys
    /// are rejected.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse TOML configuration text on top of the defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        let config = file.apply(Config::default());
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot work at runtime
    pub fn validate(&self) -> Result<()> {
        if self.stripe_count == 0 {
            return Err(StoreError::Config("stripe_count must be at least 1".to_string()));
        }
        if self.worker_threads == 0 {
            return Err(StoreError::Config("worker_threads must be at least 1".to_string()));
        }
        if self.max_connections == 0 {
            return Err(StoreError::Config("max_connections must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// On-disk shape of the configuration file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    backend: Option<BackendKind>,
    stripe_count: Option<usize>,
    listen_addr: Option<String>,
    max_connections: Option<usize>,
    worker_threads: Option<usize>,
    read_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
    max_object_size: Option<usize>,
}

impl FileConfig {
    fn apply(self, mut config: Config) -> Config {
        if let Some(v) = self.data_dir {
            config.data_dir = v;
        }
        if let Some(v) = self.backend {
            config.backend = v;
        }
        if let Some(v) = self.stripe_count {
            config.stripe_count = v;
        }
        if let Some(v) = self.listen_addr {
            config.listen_addr = v;
        }
        if let Some(v) = self.max_connections {
            config.max_connections = v;
        }
        if let Some(v) = self.worker_threads {
            config.worker_threads = v;
        }
        if let Some(v) = self.read_timeout_ms {
            config.read_timeout_ms = v;
        }
        if let Some(v) = self.write_timeout_ms {
            config.write_timeout_ms = v;
        }
        if let Some(v) = self.max_object_size {
            config.max_object_size = v;
        }
        config
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from an existing config instead of the defaults
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Set the data directory (root for all bucket files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Select the storage backend
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    /// Set the number of stripe locks
    pub fn stripe_count(mut self, count: usize) -> Self {
        self.config.stripe_count = count;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of queued connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the number of worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the largest accepted object size (in bytes)
    pub fn max_object_size(mut self, bytes: usize) -> Self {
        self.config.max_object_size = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
