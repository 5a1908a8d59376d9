//! Response definitions
//!
//! Represents responses to clients.

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    Created = 0x03,
    BadRequest = 0x04,
    TooLarge = 0x05,
}

impl Status {
    /// Whether the request failed (client or server side)
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Error | Status::BadRequest | Status::TooLarge)
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (object for RETRIEVE, object id for STORE, message for failures)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a CREATED response carrying the new object's id
    pub fn created(object_id: &str) -> Self {
        Self {
            status: Status::Created,
            payload: Some(object_id.as_bytes().to_vec()),
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Create a BAD_REQUEST response
    pub fn bad_request(message: &str) -> Self {
        Self {
            status: Status::BadRequest,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Create a TOO_LARGE response
    pub fn too_large(message: &str) -> Self {
        Self {
            status: Status::TooLarge,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Payload interpreted as UTF-8 text (for messages)
    pub fn message(&self) -> String {
        self.payload
            .as_deref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default()
    }
}
