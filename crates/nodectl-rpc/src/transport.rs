//! Length-prefixed frame codec for control-plane documents.
//!
//! Each frame carries one JSON document (a single envelope or a batch array)
//! behind a 4-byte big-endian length prefix:
//! ```text
//! +----------------+------------------+
//! |  4 bytes       |  N bytes         |
//! |  (length BE)   |  (JSON payload)  |
//! +----------------+------------------+
//! ```
//!
//! The decoder rejects payloads that are valid JSON but not a request body
//! (see [`check_body`]), so a reader never sees a bare scalar.

use bytes::{Buf, BufMut, BytesMut};
use serde_json::Value;
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use crate::protocol::{RpcError, check_body};

/// Maximum frame size (16 MB)
const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Length prefix size in bytes
const LENGTH_PREFIX_SIZE: usize = 4;

#[derive(Debug, Default)]
pub struct FrameCodec {
    /// Payload length of a frame whose prefix has been consumed
    pending: Option<usize>,
}

impl FrameCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn payload_length(&mut self, src: &mut BytesMut) -> Result<Option<usize>, CodecError> {
        if let Some(length) = self.pending {
            return Ok(Some(length));
        }
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }
        let length = src.get_u32() as usize;
        if length > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge(length));
        }
        self.pending = Some(length);
        Ok(Some(length))
    }
}

impl Decoder for FrameCodec {
    type Item = Value;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Value>, CodecError> {
        let Some(length) = self.payload_length(src)? else {
            return Ok(None);
        };
        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        self.pending = None;
        let payload = src.split_to(length);
        let body: Value = serde_json::from_str(std::str::from_utf8(&payload)?)?;
        check_body(&body).map_err(CodecError::Body)?;
        Ok(Some(body))
    }
}

impl Encoder<String> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, document: String, dst: &mut BytesMut) -> Result<(), CodecError> {
        let length = u32::try_from(document.len())
            .ok()
            .filter(|length| *length as usize <= MAX_FRAME_SIZE)
            .ok_or(CodecError::FrameTooLarge(document.len()))?;

        dst.reserve(LENGTH_PREFIX_SIZE + document.len());
        dst.put_u32(length);
        dst.put_slice(document.as_bytes());
        Ok(())
    }
}

/// Errors that can occur during codec operations
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Frame too large: {0} bytes (max: {MAX_FRAME_SIZE})")]
    FrameTooLarge(usize),

    /// Well-formed JSON that is neither an envelope nor a batch
    #[error("{0}")]
    Body(RpcError),
}
