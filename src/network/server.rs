//! TCP Server
//!
//! Accepts connections and dispatches to worker threads.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, TrySendError};

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::store::ObjectStore;

use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server for objstore
pub struct Server {
    config: Config,
    store: Arc<dyn ObjectStore>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listen address from `config`
    ///
    /// Binding to port 0 picks a free port; see [`Server::local_addr`].
    pub fn bind(config: Config, store: Arc<dyn ObjectStore>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            StoreError::Network(format!("cannot bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            store,
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Flag that stops [`Server::run`] once set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Start the server (blocking until shutdown)
    ///
    /// Connections already handed to a worker are served to completion.
    pub fn run(&self) -> Result<()> {
        let (sender, receiver) = channel::bounded::<TcpStream>(self.config.max_connections);

        let workers = (0..self.config.worker_threads)
            .map(|id| self.spawn_worker(id, receiver.clone()))
            .collect::<Result<Vec<_>>>()?;
        drop(receiver);

        tracing::info!(
            "Listening on {} ({} workers)",
            self.local_addr,
            self.config.worker_threads
        );

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", peer, e);
                        continue;
                    }
                    match sender.try_send(stream) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            tracing::warn!("Connection queue full, dropping {}", peer);
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            return Err(StoreError::Network("all workers exited".to_string()));
                        }
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                }
            }
        }

        tracing::info!("Shutting down, waiting for workers");
        drop(sender);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        Ok(())
    }

    fn spawn_worker(&self, id: usize, receiver: Receiver<TcpStream>) -> Result<JoinHandle<()>> {
        let store = Arc::clone(&self.store);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;
        let max_object_size = self.config.max_object_size;

        let handle = thread::Builder::new()
            .name(format!("objstore-worker-{}", id))
            .spawn(move || {
                for stream in receiver {
                    let peer = stream
                        .peer_addr()
                        .map(|a| a.to_string())
                        .unwrap_or_else(|_| "unknown".to_string());
                    let span = tracing::info_span!("conn", peer = %peer);

                    let result = Connection::new(stream, Arc::clone(&store), max_object_size, span)
                        .and_then(|mut conn| {
                            conn.set_timeouts(read_ms, write_ms)?;
                            conn.handle()
                        });
                    if let Err(e) = result {
                        tracing::debug!("Connection {} closed with error: {}", peer, e);
                    }
                }
            })?;

        Ok(handle)
    }
}
