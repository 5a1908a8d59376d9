//! # objstore
//!
//! An object store partitioned into buckets, with:
//! - An in-memory backend for ephemeral use
//! - A file backend keeping one record file per bucket, rewritten through a
//!   temporary file and an atomic rename on every mutation
//! - Fixed lock striping, bounding locks and open files independently of
//!   the number of buckets
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                             │
//! │            (acceptor + worker thread pool)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  Store / Retrieve / Delete
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 dyn ObjectStore                             │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐   ┌────────────────────────────────────┐
//!   │    MemStore     │   │             FileStore              │
//!   │ (RwLock<Map>)   │   │ Registry → Stripe lock → Rewrite   │
//!   └─────────────────┘   │  → rename → Metadata chain update  │
//!                         └────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod network;
pub mod protocol;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::{BackendKind, Config};
pub use store::{open_store, FileStore, MemStore, ObjectStore};
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of objstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
