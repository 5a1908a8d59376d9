//! Blocking client
//!
//! Speaks the binary protocol over one TCP connection. Used by
//! `objstore-cli` and the end-to-end tests.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::protocol::{read_response, write_command, Command, Response, Status};

/// A connection to an objstore server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| StoreError::Network(format!("cannot connect: {}", e)))?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Create or replace an object. Returns `true` if it replaced one.
    pub fn store(&mut self, bucket: &str, object: &str, payload: &[u8]) -> Result<bool> {
        let response = self.request(Command::Store {
            bucket: bucket.to_string(),
            object: object.to_string(),
            payload: Bytes::copy_from_slice(payload),
        })?;
        match response.status {
            Status::Created => Ok(false),
            Status::Ok => Ok(true),
            _ => Err(unexpected(&response)),
        }
    }

    /// Read an object. Returns `Ok(None)` if it does not exist.
    pub fn retrieve(&mut self, bucket: &str, object: &str) -> Result<Option<Vec<u8>>> {
        let response = self.request(Command::Retrieve {
            bucket: bucket.to_string(),
            object: object.to_string(),
        })?;
        match response.status {
            Status::Ok => Ok(Some(response.payload.unwrap_or_default())),
            Status::NotFound => Ok(None),
            _ => Err(unexpected(&response)),
        }
    }

    /// Delete an object. Returns `true` if it existed.
    pub fn delete(&mut self, bucket: &str, object: &str) -> Result<bool> {
        let response = self.request(Command::Delete {
            bucket: bucket.to_string(),
            object: object.to_string(),
        })?;
        match response.status {
            Status::Ok => Ok(true),
            Status::NotFound => Ok(false),
            _ => Err(unexpected(&response)),
        }
    }

    /// Health check
    pub fn ping(&mut self) -> Result<()> {
        let response = self.request(Command::Ping)?;
        match response.status {
            Status::Ok => Ok(()),
            _ => Err(unexpected(&response)),
        }
    }

    fn request(&mut self, command: Command) -> Result<Response> {
        write_command(&mut self.writer, &command)?;
        let response = read_response(&mut self.reader)?;
        match response.status {
            Status::BadRequest | Status::TooLarge => {
                Err(StoreError::Rejected(response.message()))
            }
            Status::Error => Err(StoreError::Remote(response.message())),
            _ => Ok(response),
        }
    }
}

fn unexpected(response: &Response) -> StoreError {
    StoreError::Protocol(format!("unexpected response status {:?}", response.status))
}
