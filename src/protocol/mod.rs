//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the binary envelope of the danmu protocol:
//! - 12-byte header encoding/decoding
//! - Frame encoding with the trailing terminator byte
//! - Frame reader for accumulating partial reads

mod frame;
mod frame_reader;
mod wire_format;

pub use frame::{encode_frame, extract_body, Frame};
pub use frame_reader::FrameReader;
pub use wire_format::{
    Header, CONTENT_OFFSET, DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE, KIND_FROM_SERVER,
    KIND_TO_SERVER, LENGTH_OVERHEAD, MIN_DECLARED_LENGTH, TERMINATOR,
};
