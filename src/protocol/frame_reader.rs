//! Frame reader for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` as a reusable content buffer. Reading a frame is
//! a two-step state machine:
//! - read exactly 12 header bytes
//! - read exactly `length - 8` content bytes, looping across short reads
//!
//! # Example
//!
//! ```ignore
//! use danmu_client::protocol::FrameReader;
//!
//! let mut reader = FrameReader::new(read_half);
//! loop {
//!     let frame = reader.read_frame().await?;
//!     println!("Got frame of kind {}", frame.kind());
//! }
//! ```

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::wire_format::{Header, DEFAULT_MAX_FRAME_SIZE, HEADER_SIZE};
use super::Frame;
use crate::error::{DanmuError, Result};

/// Initial capacity of the content buffer.
const INITIAL_CAPACITY: usize = 4 * 1024;

/// Reads whole frames from a byte stream.
///
/// The content buffer is reused across frames: once a returned [`Frame`]
/// is dropped its allocation is reclaimed by the next read.
pub struct FrameReader<R> {
    /// Underlying byte stream.
    reader: R,
    /// Content buffer.
    buffer: BytesMut,
    /// Maximum allowed content size.
    max_frame_size: u32,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Create a new frame reader with default settings.
    pub fn new(reader: R) -> Self {
        Self::with_max_frame_size(reader, DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a new frame reader with a custom max frame size.
    pub fn with_max_frame_size(reader: R, max_frame_size: u32) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            max_frame_size,
        }
    }

    /// Read one complete frame.
    ///
    /// # Errors
    ///
    /// - `Read` if the stream fails or ends before the frame is complete
    /// - `Protocol` if the declared length is invalid or too large
    pub async fn read_frame(&mut self) -> Result<Frame> {
        let header = self.read_header().await?;
        header.validate(self.max_frame_size)?;

        if !header.lengths_match() {
            tracing::warn!(
                length = header.length,
                duplicate = header.length_dup,
                "Frame length fields disagree, using the first"
            );
        }

        let content_length = header.content_length();
        self.read_content(content_length).await?;
        let content = self.buffer.split_to(content_length).freeze();

        Ok(Frame::new(header, content))
    }

    /// Read exactly 12 header bytes.
    async fn read_header(&mut self) -> Result<Header> {
        let mut raw = [0u8; HEADER_SIZE];
        self.reader
            .read_exact(&mut raw)
            .await
            .map_err(DanmuError::Read)?;
        Header::decode(&raw)
    }

    /// Fill the buffer with exactly `len` content bytes.
    async fn read_content(&mut self, len: usize) -> Result<()> {
        self.buffer.clear();
        self.buffer.resize(len, 0);

        let mut filled = 0;
        while filled < len {
            let n = self
                .reader
                .read(&mut self.buffer[filled..len])
                .await
                .map_err(DanmuError::Read)?;

            if n == 0 {
                return Err(DanmuError::Read(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("Stream ended after {} of {} content bytes", filled, len),
                )));
            }

            filled += n;
            if filled < len {
                tracing::trace!(filled, expected = len, "Short read, waiting for more content");
            }
        }

        Ok(())
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Get a mutable reference to the underlying stream.
    ///
    /// Reading from it directly desynchronizes the frame boundary unless the
    /// caller consumes whole frames.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }
}
