//! Frame struct and frame encoding.
//!
//! A frame is a decoded [`Header`] plus its content region: the body text
//! followed by one terminator byte. Uses `bytes::Bytes` so a frame can
//! outlive the reader's buffer without copying.
//!
//! # Example
//!
//! ```
//! use danmu_client::protocol::{encode_frame, KIND_TO_SERVER};
//!
//! let bytes = encode_frame(KIND_TO_SERVER, 0, 0, b"type@=keeplive/").unwrap();
//! assert_eq!(bytes.len(), 12 + 15 + 1);
//! assert_eq!(&bytes[0..4], &24i32.to_le_bytes());
//! ```

use bytes::Bytes;

use super::wire_format::{Header, HEADER_SIZE, TERMINATOR};
use crate::error::Result;

/// A complete inbound frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Body bytes plus the trailing terminator byte.
    pub content: Bytes,
}

impl Frame {
    /// Create a new frame from header and content.
    pub fn new(header: Header, content: Bytes) -> Self {
        Self { header, content }
    }

    /// Body text bytes, terminator removed.
    #[inline]
    pub fn body(&self) -> &[u8] {
        extract_body(&self.content)
    }

    /// Get the frame kind.
    #[inline]
    pub fn kind(&self) -> u16 {
        self.header.kind
    }

    /// Get the content length (body + terminator).
    #[inline]
    pub fn content_len(&self) -> usize {
        self.content.len()
    }
}

/// Encode a complete frame into a single byte vector.
///
/// The declared length is `9 + body.len()`, written twice, followed by the
/// kind, secret, reserved, body and a zero terminator byte.
pub fn encode_frame(kind: u16, secret: u8, reserved: u8, body: &[u8]) -> Result<Vec<u8>> {
    let header = Header::for_body(kind, secret, reserved, body.len())?;
    let mut buf = Vec::with_capacity(HEADER_SIZE + body.len() + 1);
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(body);
    buf.push(TERMINATOR);
    Ok(buf)
}

/// Drop the terminator from a content region.
///
/// The terminator is positional: whatever the last byte holds is discarded.
#[inline]
pub fn extract_body(content: &[u8]) -> &[u8] {
    match content.split_last() {
        Some((_, body)) => body,
        None => content,
    }
}
