//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread polling a shutdown flag
//! - Bounded queue of accepted connections
//! - Worker thread pool, one connection per worker at a time
//! - Requests routed through `dyn ObjectStore`

mod server;
mod connection;

pub use server::Server;
pub use connection::{format_size_binary, Connection};
