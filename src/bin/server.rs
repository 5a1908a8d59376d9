//! objstore Server Binary
//!
//! Starts the TCP server for objstore.

use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Parser;
use objstore::config::ConfigBuilder;
use objstore::network::Server;
use objstore::store::{open_file_store, LoadReport};
use objstore::{BackendKind, Config, MemStore, ObjectStore};
use tracing_subscriber::{fmt, EnvFilter};

/// objstore Server
#[derive(Parser, Debug)]
#[command(name = "objstore-server")]
#[command(about = "Bucketed object store with an optional file backend")]
#[command(version)]
struct Args {
    /// TOML configuration file, overlaid by environment and flags
    #[arg(short, long, env = "OBJSTORE_CONFIG")]
    config: Option<PathBuf>,

    /// Log every request at debug level
    #[arg(short, long, env = "OBJSTORE_VERBOSE")]
    verbose: bool,

    /// Listen address (host:port)
    #[arg(short, long, env = "OBJSTORE_LISTEN")]
    listen: Option<String>,

    /// Persist objects to disk instead of keeping them in memory
    #[arg(short, long, env = "OBJSTORE_PERSIST")]
    persist: bool,

    /// Storage directory used with --persist
    #[arg(short, long, env = "OBJSTORE_DATA_PATH")]
    data_dir: Option<PathBuf>,

    /// Number of stripe locks
    #[arg(long, env = "OBJSTORE_STRIPES")]
    stripes: Option<usize>,

    /// Number of connection worker threads
    #[arg(short, long, env = "OBJSTORE_WORKERS")]
    workers: Option<usize>,

    /// Largest accepted object in bytes
    #[arg(long, env = "OBJSTORE_MAX_OBJECT_SIZE")]
    max_object_size: Option<usize>,
}

impl Args {
    fn into_config(self) -> objstore::Result<Config> {
        let base = match &self.config {
            Some(path) => Config::from_toml_file(path)?,
            None => Config::default(),
        };

        let mut builder = ConfigBuilder::from_config(base);
        if self.persist {
            builder = builder.backend(BackendKind::File);
        }
        if let Some(addr) = self.listen {
            builder = builder.listen_addr(addr);
        }
        if let Some(dir) = self.data_dir {
            builder = builder.data_dir(dir);
        }
        if let Some(n) = self.stripes {
            builder = builder.stripe_count(n);
        }
        if let Some(n) = self.workers {
            builder = builder.worker_threads(n);
        }
        if let Some(n) = self.max_object_size {
            builder = builder.max_object_size(n);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "debug,objstore=debug"
    } else {
        "info,objstore=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let config = match args.into_config() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    tracing::info!("objstore Server v{}", objstore::VERSION);
    tracing::info!("Listen address: {}", config.listen_addr);
    match config.backend {
        BackendKind::Memory => tracing::info!("Backend: memory"),
        BackendKind::File => tracing::info!(
            "Backend: file ({}, {} stripes)",
            config.data_dir.display(),
            config.stripe_count
        ),
    }

    let store: Arc<dyn ObjectStore> = match config.backend {
        BackendKind::Memory => Arc::new(MemStore::new()),
        BackendKind::File => match open_file_store(&config) {
            Ok(s) => {
                log_load_report(s.load_report());
                Arc::new(s)
            }
            Err(e) => {
                tracing::error!("Failed to open store: {}", e);
                process::exit(1);
            }
        },
    };

    let server = match Server::bind(config, store) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            process::exit(1);
        }
    };

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Terminating on user input");
        shutdown.store(true, Ordering::SeqCst);
    }) {
        tracing::error!("Failed to install signal handler: {}", e);
        process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        process::exit(1);
    }

    tracing::info!("Server stopped. Bye.");
}

/// Log what the bootstrap found in the storage directory
fn log_load_report(report: &LoadReport) {
    tracing::info!(
        "Loaded {} buckets ({} objects)",
        report.buckets_loaded,
        report.objects_loaded
    );
    if report.empty_files_removed > 0 || report.temp_files_removed > 0 {
        tracing::info!(
            "Removed {} empty bucket files and {} stray temporary files",
            report.empty_files_removed,
            report.temp_files_removed
        );
    }
    if report.files_ignored > 0 {
        tracing::warn!("Ignored {} unrelated files", report.files_ignored);
    }
}
