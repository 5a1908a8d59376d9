//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - RETRIEVE: bucket_len (4) + bucket + object_len (4) + object
//! - STORE:    bucket_len (4) + bucket + object_len (4) + object + object bytes
//! - DELETE:   bucket_len (4) + bucket + object_len (4) + object
//! - PING:     empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::Bytes;

use crate::error::{Result, StoreError};
use super::{Command, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let cmd_type = command.command_type() as u8;

    let payload = match command {
        Command::Retrieve { bucket, object } | Command::Delete { bucket, object } => {
            let mut payload = Vec::with_capacity(8 + bucket.len() + object.len());
            put_identifier(&mut payload, bucket);
            put_identifier(&mut payload, object);
            payload
        }
        Command::Store {
            bucket,
            object,
            payload: data,
        } => {
            let mut payload = Vec::with_capacity(8 + bucket.len() + object.len() + data.len());
            put_identifier(&mut payload, bucket);
            put_identifier(&mut payload, object);
            payload.extend_from_slice(data);
            payload
        }
        Command::Ping => Vec::new(),
    };

    frame(cmd_type, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = split_frame(bytes, "command")?;

    match cmd_type {
        0x01 => {
            let (bucket, object, _) = decode_target("RETRIEVE", payload)?;
            Ok(Command::Retrieve { bucket, object })
        }
        0x02 => {
            let (bucket, object, rest) = decode_target("STORE", payload)?;
            Ok(Command::Store {
                bucket,
                object,
                payload: Bytes::copy_from_slice(rest),
            })
        }
        0x03 => {
            let (bucket, object, _) = decode_target("DELETE", payload)?;
            Ok(Command::Delete { bucket, object })
        }
        0x04 => {
            if !payload.is_empty() {
                return Err(StoreError::Protocol(format!(
                    "PING command: unexpected payload of {} bytes",
                    payload.len()
                )));
            }
            Ok(Command::Ping)
        }
        _ => Err(StoreError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        ))),
    }
}

/// Decode `bucket + object` and return the bytes after them
fn decode_target<'a>(name: &str, payload: &'a [u8]) -> Result<(String, String, &'a [u8])> {
    let (bucket, rest) = take_identifier(name, "bucket", payload)?;
    let (object, rest) = take_identifier(name, "object", rest)?;
    Ok((bucket, object, rest))
}

/// Append a length-prefixed identifier
fn put_identifier(buf: &mut Vec<u8>, id: &str) {
    buf.extend_from_slice(&(id.len() as u32).to_be_bytes());
    buf.extend_from_slice(id.as_bytes());
}

/// Split a length-prefixed UTF-8 identifier off the front of `bytes`
fn take_identifier<'a>(command: &str, field: &str, bytes: &'a [u8]) -> Result<(String, &'a [u8])> {
    if bytes.len() < 4 {
        return Err(StoreError::Protocol(format!(
            "{} command: missing {} length",
            command, field
        )));
    }

    let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let rest = &bytes[4..];
    if rest.len() < len {
        return Err(StoreError::Protocol(format!(
            "{} command: incomplete {} (expected {}, got {})",
            command,
            field,
            len,
            rest.len()
        )));
    }

    let id = std::str::from_utf8(&rest[..len]).map_err(|_| {
        StoreError::Protocol(format!("{} command: {} is not valid UTF-8", command, field))
    })?;
    Ok((id.to_string(), &rest[len..]))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::NotFound,
        0x02 => Status::Error,
        0x03 => Status::Created,
        0x04 => Status::BadRequest,
        0x05 => Status::TooLarge,
        _ => {
            return Err(StoreError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Framing
// =============================================================================

fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(kind);
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(payload);
    message
}

/// Validate a frame's header and return its kind byte and payload
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(StoreError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = payload_len(&bytes[..HEADER_SIZE], what)?;
    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(StoreError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

/// Parse and bound the length field of a frame header
fn payload_len(header: &[u8], what: &str) -> Result<usize> {
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if len > MAX_PAYLOAD_SIZE {
        return Err(StoreError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame from a stream
fn read_frame<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let len = payload_len(&header, what)?;
    let mut message = vec![0u8; HEADER_SIZE + len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }
    Ok(message)
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let message = read_frame(reader, "command")?;
    decode_command(&message)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader, "response")?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
