//! Record Codec
//!
//! Encodes and decodes the records a bucket file is made of.
//!
//! ## Record Format
//! ```text
//! ┌──────────────┬───┬──────────────┬───┬─────────────────┬────┐
//! │ object id    │ ␠ │ payload len  │ ␠ │ payload bytes   │ \n │
//! │ [a-z0-9_-]+  │   │ decimal      │   │ (len bytes)     │    │
//! └──────────────┴───┴──────────────┴───┴─────────────────┴────┘
//!  \_________ header_size ________/
//! ```
//!
//! The payload is never escaped: it may contain spaces and newlines, and is
//! always read by its declared length. A record therefore occupies
//! `header_size + payload_size + 2` bytes.

use std::io::{self, BufRead, Read, Write};

use crate::error::{Result, StoreError};

/// Byte following the identifier and the length field
pub const SEPARATOR: u8 = b' ';

/// Byte closing every record
pub const TERMINATOR: u8 = b'\n';

/// Longest identifier or length field accepted while decoding
pub const MAX_FIELD_LEN: u64 = 1024;

/// Encoded sizes of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSize {
    /// Bytes of `<object id> <payload len>`, without the trailing separator
    pub header_size: u64,
    /// Bytes of raw payload
    pub payload_size: u64,
}

impl RecordSize {
    /// Sizes of the record `object_id` would get for a payload of `payload_len` bytes
    pub fn of(object_id: &str, payload_len: usize) -> Self {
        let digits = payload_len.to_string().len() as u64;
        Self {
            header_size: object_id.len() as u64 + 1 + digits,
            payload_size: payload_len as u64,
        }
    }

    /// Total bytes the record occupies in the file
    pub fn encoded_len(&self) -> u64 {
        self.header_size + self.payload_size + 2
    }
}

/// A fully decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub object_id: String,
    pub payload: Vec<u8>,
}

/// Location and sizes of a record, decoded without its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    /// Offset of the identifier from the start of the file
    pub offset: u64,
    pub object_id: String,
    pub size: RecordSize,
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode `<object id> <payload len> ` (separator included)
pub fn encode_header(object_id: &str, payload_len: usize) -> Vec<u8> {
    format!("{} {} ", object_id, payload_len).into_bytes()
}

/// Encode a complete record
pub fn encode_record(object_id: &str, payload: &[u8]) -> Vec<u8> {
    let mut bytes = encode_header(object_id, payload.len());
    bytes.reserve(payload.len() + 1);
    bytes.extend_from_slice(payload);
    bytes.push(TERMINATOR);
    bytes
}

/// Write a complete record to `writer`
pub fn write_record<W: Write>(writer: &mut W, object_id: &str, payload: &[u8]) -> Result<RecordSize> {
    let header = encode_header(object_id, payload.len());
    writer.write_all(&header)?;
    writer.write_all(payload)?;
    writer.write_all(&[TERMINATOR])?;

    Ok(RecordSize {
        header_size: header.len() as u64 - 1,
        payload_size: payload.len() as u64,
    })
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode the first record in `bytes`
///
/// Returns the record and the number of bytes it occupied.
pub fn decode_record(bytes: &[u8]) -> Result<(Record, usize)> {
    let mut reader = RecordReader::new(bytes);
    match reader.next_record()? {
        Some(record) => Ok((record, reader.position() as usize)),
        None => Err(StoreError::Format("no record in empty input".to_string())),
    }
}

/// Sequential reader over the records of a bucket file
pub struct RecordReader<R> {
    reader: R,
    /// Bytes consumed so far
    position: u64,
}

impl<R: BufRead> RecordReader<R> {
    /// Start reading at the beginning of `reader`
    pub fn new(reader: R) -> Self {
        Self { reader, position: 0 }
    }

    /// Bytes consumed so far, i.e. the offset of the next record
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next record header and skip its payload
    ///
    /// Returns `Ok(None)` at a clean end of input (a record boundary).
    pub fn next_header(&mut self) -> Result<Option<RecordHeader>> {
        let Some(header) = self.read_header()? else {
            return Ok(None);
        };

        let payload_size = header.size.payload_size;
        let skipped = io::copy(&mut (&mut self.reader).take(payload_size), &mut io::sink())?;
        self.position += skipped;
        if skipped < payload_size {
            return Err(truncated_payload(&header, skipped));
        }
        self.read_terminator(&header)?;

        Ok(Some(header))
    }

    /// Read the next record including its payload
    ///
    /// Returns `Ok(None)` at a clean end of input (a record boundary).
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let Some(header) = self.read_header()? else {
            return Ok(None);
        };

        let payload_size = header.size.payload_size;
        let mut payload = Vec::new();
        let read = (&mut self.reader).take(payload_size).read_to_end(&mut payload)? as u64;
        self.position += read;
        if read < payload_size {
            return Err(truncated_payload(&header, read));
        }
        self.read_terminator(&header)?;

        Ok(Some(Record {
            object_id: header.object_id,
            payload,
        }))
    }

    fn read_header(&mut self) -> Result<Option<RecordHeader>> {
        let offset = self.position;

        let Some(id_field) = self.read_field("identifier")? else {
            return Ok(None);
        };
        if id_field.is_empty() {
            return Err(StoreError::Format(format!(
                "empty object identifier at offset {}",
                offset
            )));
        }
        let id_len = id_field.len() as u64;
        let object_id = String::from_utf8(id_field).map_err(|_| {
            StoreError::Format(format!("object identifier at offset {} is not UTF-8", offset))
        })?;

        let len_field = self.read_field("length")?.ok_or_else(|| {
            StoreError::Format(format!(
                "truncated record {:?} at offset {}: missing length field",
                object_id, offset
            ))
        })?;
        let payload_size = parse_length(&len_field).ok_or_else(|| {
            StoreError::Format(format!(
                "invalid payload length {:?} for object {:?} at offset {}",
                String::from_utf8_lossy(&len_field),
                object_id,
                offset
            ))
        })?;

        Ok(Some(RecordHeader {
            offset,
            object_id,
            size: RecordSize {
                header_size: id_len + 1 + len_field.len() as u64,
                payload_size,
            },
        }))
    }

    /// Read bytes up to and including the next separator, returning them
    /// without the separator. `Ok(None)` if the input is already exhausted.
    fn read_field(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut field = Vec::new();
        let read = (&mut self.reader)
            .take(MAX_FIELD_LEN + 1)
            .read_until(SEPARATOR, &mut field)?;
        if read == 0 {
            return Ok(None);
        }
        self.position += read as u64;

        if field.last() != Some(&SEPARATOR) {
            return Err(if read as u64 > MAX_FIELD_LEN {
                StoreError::Format(format!(
                    "{} field exceeds {} bytes at offset {}",
                    name,
                    MAX_FIELD_LEN,
                    self.position - read as u64
                ))
            } else {
                StoreError::Format(format!(
                    "truncated record: unterminated {} field at offset {}",
                    name,
                    self.position - read as u64
                ))
            });
        }
        field.pop();
        Ok(Some(field))
    }

    fn read_terminator(&mut self, header: &RecordHeader) -> Result<()> {
        let mut byte = [0u8; 1];
        match self.reader.read_exact(&mut byte) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(StoreError::Format(format!(
                    "truncated record {:?} at offset {}: missing terminator",
                    header.object_id, header.offset
                )));
            }
            Err(e) => return Err(e.into()),
        }
        self.position += 1;

        if byte[0] != TERMINATOR {
            return Err(StoreError::Format(format!(
                "record {:?} at offset {} ends with 0x{:02x} instead of a newline",
                header.object_id, header.offset, byte[0]
            )));
        }
        Ok(())
    }
}

/// Parse a decimal length made of ASCII digits only
fn parse_length(field: &[u8]) -> Option<u64> {
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(field).ok()?.parse().ok()
}

fn truncated_payload(header: &RecordHeader, found: u64) -> StoreError {
    StoreError::Format(format!(
        "truncated record {:?} at offset {}: expected {} payload bytes, found {}",
        header.object_id, header.offset, header.size.payload_size, found
    ))
}
