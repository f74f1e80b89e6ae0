//! Dedicated writer task serializing frames onto the stream.
//!
//! The login request, the join request, the heartbeat and caller messages
//! all share one write half. Instead of wrapping it in a mutex, a single
//! task owns it and receives encoded frames over an mpsc channel, so every
//! frame is written whole before the next one starts.
//!
//! # Architecture
//!
//! ```text
//! join_room  ─┐
//! heartbeat  ─┼─► mpsc::Sender<OutboundFrame> ─► Writer Task ─► Stream
//! send       ─┘
//! ```
//!
//! The writer task ends cleanly when every [`WriterHandle`] is dropped or
//! the session shuts down (and shuts the write half down in both cases), or
//! with `Err(Write)` on the first failed write.

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::deadline::io_deadline;
use crate::error::{DanmuError, Result};
use crate::message::Message;
use crate::shutdown::Shutdown;

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Default timeout for writing one frame.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// A frame ready to be written to the stream.
#[derive(Debug)]
pub struct OutboundFrame {
    /// Complete encoded frame (header, body, terminator).
    pub bytes: Bytes,
    /// Notified once the frame is written or has failed.
    done: Option<oneshot::Sender<Result<()>>>,
}

impl OutboundFrame {
    /// Create a new outbound frame.
    #[inline]
    pub fn new(bytes: Bytes) -> Self {
        Self { bytes, done: None }
    }

    /// Encode a message into an outbound frame.
    pub fn from_message(message: &Message) -> Result<Self> {
        Ok(Self::new(Bytes::from(message.encode()?)))
    }

    /// Total size of this frame.
    #[inline]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Configuration for the writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Channel capacity for the frame queue.
    pub channel_capacity: usize,
    /// Timeout for writing one frame. `None` waits forever.
    pub write_timeout: Option<Duration>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            write_timeout: Some(DEFAULT_WRITE_TIMEOUT),
        }
    }
}

/// Handle for sending frames to the writer task.
///
/// This is cheaply cloneable and can be shared across tasks.
#[derive(Clone, Debug)]
pub struct WriterHandle {
    /// Channel sender for frames.
    tx: mpsc::Sender<OutboundFrame>,
}

impl WriterHandle {
    /// Queue a frame without waiting for it to be written.
    ///
    /// Waits only while the queue is full.
    pub async fn send(&self, frame: OutboundFrame) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| DanmuError::ConnectionClosed)
    }

    /// Write a frame and wait until it is fully on the stream.
    pub async fn write(&self, bytes: Bytes) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        let frame = OutboundFrame {
            bytes,
            done: Some(done_tx),
        };
        self.send(frame).await?;

        // A dropped sender means the task exited before reaching this frame
        done_rx.await.unwrap_or(Err(DanmuError::ConnectionClosed))
    }

    /// Encode and write a message, waiting until it is fully on the stream.
    pub async fn write_message(&self, message: &Message) -> Result<()> {
        self.write(Bytes::from(message.encode()?)).await
    }

    /// Check if the writer task has stopped.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the writer task and return a handle for sending frames.
///
/// # Arguments
///
/// * `writer` - The async writer (stream write half)
/// * `config` - Writer configuration
///
/// # Returns
///
/// A tuple of `(WriterHandle, JoinHandle)`. The JoinHandle resolves with the
/// first write error, or `Ok(())` once all handles are dropped.
pub fn spawn_writer_task<W>(
    writer: W,
    config: WriterConfig,
) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    spawn_writer_task_until(writer, config, Shutdown::new())
}

/// Spawn the writer task, stopping it when `shutdown` fires.
///
/// On shutdown a frame still being written is abandoned, its waiter sees
/// `ConnectionClosed`, and the write half is shut down.
pub(crate) fn spawn_writer_task_until<W>(
    writer: W,
    config: WriterConfig,
    shutdown: Shutdown,
) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let task = tokio::spawn(writer_loop(rx, writer, config.write_timeout, shutdown));
    (WriterHandle { tx }, task)
}

/// Spawn the writer task with default configuration.
pub fn spawn_writer_task_default<W>(writer: W) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    spawn_writer_task(writer, WriterConfig::default())
}

/// Main writer loop - receives frames and writes them one at a time.
async fn writer_loop<W>(
    mut rx: mpsc::Receiver<OutboundFrame>,
    mut writer: W,
    write_timeout: Option<Duration>,
    shutdown: Shutdown,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.triggered() => break,
            frame = rx.recv() => match frame {
                Some(frame) => frame,
                // Channel closed, clean shutdown
                None => break,
            },
        };

        let result = tokio::select! {
            biased;
            _ = shutdown.triggered() => {
                tracing::debug!(size = frame.size(), "Abandoning frame on shutdown");
                if let Some(done) = frame.done {
                    let _ = done.send(Err(DanmuError::ConnectionClosed));
                }
                break;
            }
            result = io_deadline(write_timeout, write_frame(&mut writer, &frame.bytes)) => result,
        };

        match result {
            Ok(()) => {
                if let Some(done) = frame.done {
                    let _ = done.send(Ok(()));
                }
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!("Frame write failed: {}", reason);
                if let Some(done) = frame.done {
                    let _ = done.send(Err(DanmuError::Write(reason.clone())));
                }
                // Queued frames are dropped; their waiters see ConnectionClosed
                return Err(DanmuError::Write(reason));
            }
        }
    }

    let _ = writer.shutdown().await;
    Ok(())
}

/// Write one whole frame and flush it.
async fn write_frame<W>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(bytes).await?;
    writer.flush().await
}
