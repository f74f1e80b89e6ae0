//! Session configuration.

use std::time::Duration;

use crate::protocol::DEFAULT_MAX_FRAME_SIZE;
use crate::writer::{WriterConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_WRITE_TIMEOUT};

/// Public danmu gateway.
pub const DEFAULT_HOST: &str = "openbarrage.douyutv.com";

/// Public danmu gateway port.
pub const DEFAULT_PORT: u16 = 8601;

/// Room used by the demo when none is given.
pub const DEFAULT_ROOM_ID: u32 = 288016;

/// Heartbeat period expected by the server.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(45);

/// Two heartbeat periods without a frame means the server is gone.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(90);

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Size of the scratch buffer for the login acknowledgement.
pub const DEFAULT_LOGIN_ACK_BUFFER_SIZE: usize = 1000;

/// Settings for a [`Session`](crate::Session).
///
/// Host, port and room are call parameters, not configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Period between `keeplive` frames.
    pub heartbeat_interval: Duration,
    /// Limit for each frame read and for the login acknowledgement.
    /// `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Limit for writing one frame. `None` waits forever.
    pub write_timeout: Option<Duration>,
    /// Limit for the TCP dial. `None` waits forever.
    pub connect_timeout: Option<Duration>,
    /// Largest declared frame length accepted from the server.
    pub max_frame_size: u32,
    /// Bytes read (and discarded) as the login acknowledgement.
    pub login_ack_buffer_size: usize,
    /// Outbound frames queued before senders wait.
    pub writer_channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            write_timeout: Some(DEFAULT_WRITE_TIMEOUT),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            login_ack_buffer_size: DEFAULT_LOGIN_ACK_BUFFER_SIZE,
            writer_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl SessionConfig {
    pub(crate) fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            channel_capacity: self.writer_channel_capacity,
            write_timeout: self.write_timeout,
        }
    }
}
