//! Wire format encoding and decoding.
//!
//! Implements the 12-byte envelope header:
//! ```text
//! ┌──────────┬──────────┬──────────┬────────┬──────────┐
//! │ Length   │ Length   │ Kind     │ Secret │ Reserved │
//! │ 4 bytes  │ 4 bytes  │ 2 bytes  │ 1 byte │ 1 byte   │
//! │ int32 LE │ int32 LE │ int16 LE │        │          │
//! └──────────┴──────────┴──────────┴────────┴──────────┘
//! ```
//!
//! The header is followed by the body text and a single terminator byte.
//! The length field counts `9 + body`: the kind, secret, reserved and
//! terminator bytes plus the body plus one of the two length fields. After
//! the 12 header bytes are consumed, `length - 8` bytes (body + terminator)
//! remain to be read.
//!
//! All multi-byte integers are Little Endian.

use crate::error::{DanmuError, Result};

/// Header size in bytes (fixed, exactly 12).
pub const HEADER_SIZE: usize = 12;

/// Bytes counted by the length field on top of the body length.
pub const LENGTH_OVERHEAD: usize = 9;

/// Subtracted from the declared length to get the bytes left after the header.
pub const CONTENT_OFFSET: i32 = 8;

/// Smallest declared length that still leaves room for the terminator.
pub const MIN_DECLARED_LENGTH: i32 = LENGTH_OVERHEAD as i32;

/// Value written as the frame terminator. Ignored on decode.
pub const TERMINATOR: u8 = 0;

/// Frame kind for client → server messages.
pub const KIND_TO_SERVER: u16 = 689;

/// Frame kind for server → client messages.
pub const KIND_FROM_SERVER: u16 = 690;

/// Default ceiling for the content region of an inbound frame (300 KiB).
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 300 * 1024;

/// Decoded envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Declared length (`9 + body length`).
    pub length: i32,
    /// Duplicate of `length`. Never checked by the upstream protocol.
    pub length_dup: i32,
    /// Frame kind (`KIND_TO_SERVER` or `KIND_FROM_SERVER`).
    pub kind: u16,
    /// Secret byte, always 0.
    pub secret: u8,
    /// Reserved byte, always 0.
    pub reserved: u8,
}

impl Header {
    /// Create a header from raw field values.
    pub fn new(length: i32, kind: u16, secret: u8, reserved: u8) -> Self {
        Self {
            length,
            length_dup: length,
            kind,
            secret,
            reserved,
        }
    }

    /// Create the header for a body of `body_len` bytes.
    ///
    /// Fails if `9 + body_len` does not fit the 32-bit length field.
    pub fn for_body(kind: u16, secret: u8, reserved: u8, body_len: usize) -> Result<Self> {
        let length = body_len
            .checked_add(LENGTH_OVERHEAD)
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| {
                DanmuError::Protocol(format!(
                    "Body of {} bytes does not fit the 32-bit length field",
                    body_len
                ))
            })?;
        Ok(Self::new(length, kind, secret, reserved))
    }

    /// Encode header to bytes (Little Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use danmu_client::protocol::{Header, KIND_TO_SERVER};
    ///
    /// let header = Header::new(40, KIND_TO_SERVER, 0, 0);
    /// let bytes = header.encode();
    /// assert_eq!(bytes.len(), 12);
    /// assert_eq!(&bytes[0..4], &40i32.to_le_bytes());
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (12 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..4].copy_from_slice(&self.length.to_le_bytes());
        buf[4..8].copy_from_slice(&self.length_dup.to_le_bytes());
        buf[8..10].copy_from_slice(&self.kind.to_le_bytes());
        buf[10] = self.secret;
        buf[11] = self.reserved;
    }

    /// Decode header from bytes (Little Endian).
    ///
    /// Fails with `Protocol` if fewer than 12 bytes are supplied.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(DanmuError::Protocol(format!(
                "Short header: got {} of {} bytes",
                buf.len(),
                HEADER_SIZE
            )));
        }
        Ok(Self {
            length: i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            length_dup: i32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            kind: u16::from_le_bytes([buf[8], buf[9]]),
            secret: buf[10],
            reserved: buf[11],
        })
    }

    /// Number of bytes following the header: body plus terminator.
    ///
    /// Only meaningful once [`validate`](Self::validate) has passed.
    #[inline]
    pub fn content_length(&self) -> usize {
        self.length
            .checked_sub(CONTENT_OFFSET)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
    }

    /// Length of the body text alone.
    #[inline]
    pub fn body_length(&self) -> usize {
        self.content_length().saturating_sub(1)
    }

    /// Whether both length fields agree.
    #[inline]
    pub fn lengths_match(&self) -> bool {
        self.length == self.length_dup
    }

    /// Validate the header before reading its content.
    ///
    /// Checks:
    /// - Declared length leaves room for the terminator
    /// - Content length doesn't exceed `max_frame_size`
    pub fn validate(&self, max_frame_size: u32) -> Result<()> {
        if self.length < MIN_DECLARED_LENGTH {
            return Err(DanmuError::Protocol(format!(
                "Declared length {} is below the minimum {}",
                self.length, MIN_DECLARED_LENGTH
            )));
        }

        if self.content_length() > max_frame_size as usize {
            return Err(DanmuError::Protocol(format!(
                "Frame size {} exceeds maximum {}",
                self.content_length(),
                max_frame_size
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode_roundtrip() {
        let original = Header::new(40, KIND_TO_SERVER, 0, 0);
        let encoded = original.encode();
        let decoded = Header::decode(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_header_little_endian_byte_order() {
        let header = Header::new(0x0102_0304, 0x0506, 0x07, 0x08);
        let bytes = header.encode();

        // Length: 0x01020304 in LE, twice
        assert_eq!(&bytes[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[4..8], &[0x04, 0x03, 0x02, 0x01]);

        // Kind: 0x0506 in LE
        assert_eq!(bytes[8], 0x06);
        assert_eq!(bytes[9], 0x05);

        assert_eq!(bytes[10], 0x07);
        assert_eq!(bytes[11], 0x08);
    }

    #[test]
    fn test_kind_constants_on_the_wire() {
        let bytes = Header::new(9, KIND_TO_SERVER, 0, 0).encode();
        assert_eq!(&bytes[8..10], &[0xB1, 0x02]);

        let bytes = Header::new(9, KIND_FROM_SERVER, 0, 0).encode();
        assert_eq!(&bytes[8..10], &[0xB2, 0x02]);
    }

    #[test]
    fn test_for_body_length() {
        let header = Header::for_body(KIND_TO_SERVER, 0, 0, 31).unwrap();
        assert_eq!(header.length, 40);
        assert_eq!(header.length_dup, 40);
    }

    #[test]
    fn test_for_body_overflow() {
        let result = Header::for_body(KIND_TO_SERVER, 0, 0, i32::MAX as usize);
        assert!(matches!(result, Err(DanmuError::Protocol(_))));
    }

    #[test]
    fn test_decode_too_short_buffer() {
        let buf = [0u8; 11]; // One byte short
        let result = Header::decode(&buf);
        assert!(matches!(result, Err(DanmuError::Protocol(_))));
        assert!(result.unwrap_err().to_string().contains("Short header"));
    }

    #[test]
    fn test_content_length_offset() {
        // 9 + 91 body bytes declared, 91 body + 1 terminator follow the header
        let header = Header::new(100, KIND_FROM_SERVER, 0, 0);
        assert_eq!(header.content_length(), 92);
        assert_eq!(header.body_length(), 91);
    }

    #[test]
    fn test_content_length_matches_encoded_tail() {
        for body_len in [0usize, 1, 31, 1000] {
            let header = Header::for_body(KIND_TO_SERVER, 0, 0, body_len).unwrap();
            assert_eq!(header.content_length(), body_len + 1);
        }
    }

    #[test]
    fn test_validate_minimum_length() {
        let header = Header::new(8, KIND_FROM_SERVER, 0, 0);
        let result = header.validate(DEFAULT_MAX_FRAME_SIZE);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("below the minimum"));

        let header = Header::new(9, KIND_FROM_SERVER, 0, 0);
        assert!(header.validate(DEFAULT_MAX_FRAME_SIZE).is_ok());
        assert_eq!(header.content_length(), 1);
    }

    #[test]
    fn test_validate_negative_length() {
        let header = Header::new(-1, KIND_FROM_SERVER, 0, 0);
        assert!(header.validate(DEFAULT_MAX_FRAME_SIZE).is_err());
        assert_eq!(header.content_length(), 0);
    }

    #[test]
    fn test_validate_frame_too_large() {
        let header = Header::new(1_000_000, KIND_FROM_SERVER, 0, 0);
        let result = header.validate(100);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_lengths_match() {
        let mut header = Header::new(40, KIND_FROM_SERVER, 0, 0);
        assert!(header.lengths_match());
        header.length_dup = 41;
        assert!(!header.lengths_match());
    }

    #[test]
    fn test_content_length_of_extreme_lengths() {
        let mut raw = [0u8; HEADER_SIZE];
        raw[0..4].copy_from_slice(&i32::MIN.to_le_bytes());
        let header = Header::decode(&raw).unwrap();
        assert_eq!(header.content_length(), 0);
        assert_eq!(header.body_length(), 0);
        assert!(header.validate(DEFAULT_MAX_FRAME_SIZE).is_err());

        let header = Header::new(i32::MAX, KIND_FROM_SERVER, 0, 0);
        assert_eq!(header.content_length(), (i32::MAX - 8) as usize);
    }
}
