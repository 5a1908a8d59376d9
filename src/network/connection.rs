//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use tracing::Span;

use crate::error::{Result, StoreError};
use crate::protocol::{read_command, write_response, Command, Response, Status};
use crate::store::{is_valid_identifier, ObjectStore};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Backend serving the requests
    store: Arc<dyn ObjectStore>,

    /// Largest object accepted by a Store request
    max_object_size: usize,

    /// Span every request of this connection is logged in
    span: Span,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(
        stream: TcpStream,
        store: Arc<dyn ObjectStore>,
        max_object_size: usize,
        span: Span,
    ) -> Result<Self> {
        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            store,
            max_object_size,
            span,
        })
    }

    /// Configure connection timeouts (0 disables a timeout)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads commands in a loop and sends responses.
    /// Returns when the client disconnects or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        let span = self.span.clone();
        let _guard = span.enter();
        tracing::debug!("Connection established");

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(StoreError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client disconnected");
                    return Ok(());
                }
                Err(StoreError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    // Windows reports TimedOut instead of WouldBlock
                    tracing::debug!("Read timeout");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading request: {}", e);
                    let _ = self.send_response(Response::error(&e.to_string()));
                    return Err(e);
                }
            };

            let response = self.execute_command(command);

            if let Err(e) = self.send_response(response) {
                if let StoreError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) || io_err.kind() == ErrorKind::BrokenPipe {
                        tracing::debug!("Client disconnected before response could be sent: {}", e);
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing response: {}", e);
                return Err(e);
            }
        }
    }

    /// Execute a command and return a response
    pub fn execute_command(&self, command: Command) -> Response {
        let (bucket, object) = match command.target() {
            Some((bucket, object)) => (bucket.to_string(), object.to_string()),
            None => return Response::ok(None),
        };
        let op = match command {
            Command::Retrieve { .. } => "RETRIEVE",
            Command::Store { .. } => "STORE",
            Command::Delete { .. } => "DELETE",
            Command::Ping => "PING",
        };

        let response = self.dispatch(command, &bucket, &object);
        if response.status.is_failure() {
            tracing::warn!("{} {}/{} {:?}: {}", op, bucket, object, response.status, response.message());
        } else {
            tracing::debug!("{} {}/{} {:?}", op, bucket, object, response.status);
        }
        response
    }

    fn dispatch(&self, command: Command, bucket: &str, object: &str) -> Response {
        if !is_valid_identifier(bucket) || !is_valid_identifier(object) {
            return Response::bad_request(
                "Bucket and object identifiers must match [a-z0-9_-]+",
            );
        }

        match command {
            Command::Store { payload, .. } => {
                if payload.len() > self.max_object_size {
                    return Response::too_large(&format!(
                        "Object size exceeds maximum size of {}",
                        format_size_binary(self.max_object_size as u64)
                    ));
                }
                match self.store.store(&payload, object, bucket) {
                    Ok(true) => Response {
                        status: Status::Ok,
                        payload: Some(object.as_bytes().to_vec()),
                    },
                    Ok(false) => Response::created(object),
                    Err(e) => Response::error(&format!("Error storing object: {}", e)),
                }
            }
            Command::Retrieve { .. } => match self.store.retrieve(object, bucket) {
                Ok(Some(bytes)) => Response::ok(Some(bytes.to_vec())),
                Ok(None) => not_found(bucket, object),
                Err(e) => Response::error(&format!("Error retrieving object: {}", e)),
            },
            Command::Delete { .. } => match self.store.delete(object, bucket) {
                Ok(true) => Response::ok(None),
                Ok(false) => not_found(bucket, object),
                Err(e) => Response::error(&format!("Error deleting object: {}", e)),
            },
            Command::Ping => Response::ok(None),
        }
    }

    /// Send a response to the client
    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }
}

fn not_found(bucket: &str, object: &str) -> Response {
    Response {
        status: Status::NotFound,
        payload: Some(format!("Object {}/{} not found", bucket, object).into_bytes()),
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}

/// Human readable size in binary units, e.g. `512 Bytes` or `10.0 MiB`
pub fn format_size_binary(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} Bytes", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    let prefix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}iB", bytes as f64 / div as f64, prefix)
}
