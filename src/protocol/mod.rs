//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (V1 - Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: RETRIEVE - Payload: bucket + object
//! - 0x02: STORE    - Payload: bucket + object + object bytes
//! - 0x03: DELETE   - Payload: bucket + object
//! - 0x04: PING     - Payload: empty
//!
//! Identifiers are encoded as `len (4) + UTF-8 bytes`.
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK          (replaced / found / deleted)
//! - 0x01: NOT_FOUND
//! - 0x02: ERROR
//! - 0x03: CREATED     (new object stored)
//! - 0x04: BAD_REQUEST (identifier outside `[a-z0-9_-]+`)
//! - 0x05: TOO_LARGE   (object above the configured size limit)

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::{Response, Status};
pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
