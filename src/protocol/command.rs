//! Command definitions
//!
//! Represents commands from clients.

use bytes::Bytes;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Retrieve = 0x01,
    Store = 0x02,
    Delete = 0x03,
    Ping = 0x04,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read an object
    Retrieve { bucket: String, object: String },

    /// Create or replace an object
    Store {
        bucket: String,
        object: String,
        payload: Bytes,
    },

    /// Delete an object
    Delete { bucket: String, object: String },

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Retrieve { .. } => CommandType::Retrieve,
            Command::Store { .. } => CommandType::Store,
            Command::Delete { .. } => CommandType::Delete,
            Command::Ping => CommandType::Ping,
        }
    }

    /// Bucket and object the command addresses, if any
    pub fn target(&self) -> Option<(&str, &str)> {
        match self {
            Command::Retrieve { bucket, object }
            | Command::Store { bucket, object, .. }
            | Command::Delete { bucket, object } => Some((bucket.as_str(), object.as_str())),
            Command::Ping => None,
        }
    }
}
