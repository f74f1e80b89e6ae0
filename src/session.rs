//! Session lifecycle: connect, join a room, watch for messages, close.
//!
//! A [`Session`] walks through these states:
//!
//! ```text
//! Unconnected ─connect─► Connected ─join_room─► JoinedRoom ─watch─► Watching
//!                            │                      │                  │
//!                            └──────────────────────┴──────────────────┴─► Failed / Closed
//! ```
//!
//! Connecting splits the stream. The write half goes to a writer task shared
//! by the login, join, heartbeat and [`Session::send`]. The read half stays
//! with the session and is only read by `join_room` (one bounded ack read)
//! and `watch`.
//!
//! # Example
//!
//! ```ignore
//! use danmu_client::{Message, Session};
//!
//! #[tokio::main]
//! async fn main() -> danmu_client::Result<()> {
//!     let mut session = Session::builder()
//!         .handler(|message: &Message| println!("{}", message.body()))
//!         .connect("openbarrage.douyutv.com", 8601)
//!         .await?;
//!
//!     session.join_room(288016).await?;
//!     session.watch().await
//! }
//! ```

use std::fmt;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::deadline::io_deadline;
use crate::error::{DanmuError, Result};
use crate::handler::{Dispatcher, MessageHandler};
use crate::heartbeat::spawn_heartbeat;
use crate::message::{Message, MessageType};
use crate::protocol::{Frame, FrameReader};
use crate::shutdown::Shutdown;
use crate::writer::{spawn_writer_task_until, WriterHandle};

type BoxedRead = Box<dyn AsyncRead + Unpin + Send>;

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, no stream yet.
    Unconnected,
    /// Stream established, heartbeat running.
    Connected,
    /// Logged in and joined the room's group.
    JoinedRoom,
    /// Inside `watch`.
    Watching,
    /// Closed by the caller.
    Closed,
    /// Stopped by an I/O or protocol error.
    Failed,
}

impl SessionState {
    /// `Closed` and `Failed` are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Unconnected => "unconnected",
            SessionState::Connected => "connected",
            SessionState::JoinedRoom => "joined",
            SessionState::Watching => "watching",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for configuring and creating a [`Session`].
pub struct SessionBuilder {
    config: SessionConfig,
    dispatcher: Dispatcher,
}

impl SessionBuilder {
    /// Create a builder with default configuration and no handlers.
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            dispatcher: Dispatcher::new(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the catch-all message handler.
    pub fn handler<H: MessageHandler>(mut self, handler: H) -> Self {
        self.dispatcher.set_handler(handler);
        self
    }

    /// Route one message type to its own handler.
    pub fn on<H: MessageHandler>(mut self, message_type: impl Into<MessageType>, handler: H) -> Self {
        self.dispatcher.route(message_type, handler);
        self
    }

    /// Set the heartbeat period.
    ///
    /// Default: 45 seconds
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Set the per-frame read timeout. `None` waits forever.
    ///
    /// Default: 90 seconds
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set the per-frame write timeout. `None` waits forever.
    ///
    /// Default: 10 seconds
    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Set the TCP dial timeout. `None` waits forever.
    ///
    /// Default: 10 seconds
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the largest frame accepted from the server.
    ///
    /// Default: 300 KiB
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set the login acknowledgement buffer size.
    ///
    /// Default: 1000
    pub fn login_ack_buffer_size(mut self, size: usize) -> Self {
        self.config.login_ack_buffer_size = size;
        self
    }

    /// Set the writer channel capacity.
    ///
    /// Default: 64
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.writer_channel_capacity = capacity;
        self
    }

    /// Build an unconnected session.
    pub fn build(self) -> Session {
        Session::with_dispatcher(self.config, self.dispatcher)
    }

    /// Build the session and connect it.
    pub async fn connect(self, host: &str, port: u16) -> Result<Session> {
        let mut session = self.build();
        session.connect(host, port).await?;
        Ok(session)
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle that closes a session from another task.
///
/// A `watch` or `join_room` blocked on the session returns
/// `ConnectionClosed`, and the writer abandons any frame still in flight.
#[derive(Clone, Debug)]
pub struct CloseHandle {
    shutdown: Shutdown,
}

impl CloseHandle {
    pub fn close(&self) {
        self.shutdown.trigger();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_triggered()
    }
}

/// A connection to one danmu server.
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    dispatcher: Dispatcher,
    /// Read half, present from connect until watch or close.
    reader: Option<FrameReader<BoxedRead>>,
    /// Handle to the writer task.
    writer: Option<WriterHandle>,
    shutdown: Shutdown,
    heartbeat: Option<JoinHandle<()>>,
    last_error: Option<String>,
}

impl Session {
    /// Create an unconnected session.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_dispatcher(config, Dispatcher::new())
    }

    /// Create a new session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    fn with_dispatcher(config: SessionConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            state: SessionState::Unconnected,
            dispatcher,
            reader: None,
            writer: None,
            shutdown: Shutdown::new(),
            heartbeat: None,
            last_error: None,
        }
    }

    /// Dial the server and start the session over the TCP stream.
    ///
    /// A failed dial leaves the session `Unconnected`.
    pub async fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        self.expect_state("connect", SessionState::Unconnected)?;

        let addr = format!("{}:{}", host, port);
        let stream = match io_deadline(
            self.config.connect_timeout,
            TcpStream::connect(addr.as_str()),
        )
        .await
        {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(%addr, "Connect failed: {}", e);
                self.last_error = Some(e.to_string());
                return Err(DanmuError::Connection(e));
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Could not disable Nagle: {}", e);
        }

        tracing::info!(%addr, "Connected to danmu server");
        self.attach(stream)
    }

    /// Start the session over an already established stream.
    ///
    /// Spawns the writer task and the heartbeat, so this must be called
    /// from within a tokio runtime.
    pub fn attach<S>(&mut self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        self.expect_state("attach", SessionState::Unconnected)?;

        let (read_half, write_half) = tokio::io::split(stream);

        let (writer, writer_task) = spawn_writer_task_until(
            write_half,
            self.config.writer_config(),
            self.shutdown.clone(),
        );
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            match writer_task.await {
                Ok(Ok(())) => {}
                Ok(Err(DanmuError::Write(reason))) => shutdown.fail(reason),
                Ok(Err(e)) => shutdown.fail(e.to_string()),
                Err(e) => shutdown.fail(format!("writer task aborted: {}", e)),
            }
        });

        self.heartbeat = Some(spawn_heartbeat(
            writer.clone(),
            self.config.heartbeat_interval,
            self.shutdown.clone(),
        ));
        let read_half: BoxedRead = Box::new(read_half);
        self.reader = Some(FrameReader::with_max_frame_size(
            read_half,
            self.config.max_frame_size,
        ));
        self.writer = Some(writer);
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Log in to a room and join its group.
    ///
    /// Sends `loginreq`, reads the acknowledgement once into a bounded
    /// buffer without parsing it, then sends `joingroup` with the all-groups
    /// id. Any failure leaves the session `Failed`; a close during the
    /// exchange returns `ConnectionClosed` and leaves it `Closed`.
    pub async fn join_room(&mut self, room_id: u32) -> Result<()> {
        self.expect_state("join room", SessionState::Connected)?;

        match self.login(room_id).await {
            Ok(()) => {
                tracing::info!(room_id, "Joined room");
                self.state = SessionState::JoinedRoom;
                Ok(())
            }
            Err(_) if self.closed_by_caller() => {
                tracing::info!(room_id, "Join interrupted: session closed");
                self.teardown();
                self.state = SessionState::Closed;
                Err(DanmuError::ConnectionClosed)
            }
            Err(e) => {
                tracing::error!(room_id, "Join failed: {}", e);
                Err(self.fail(e))
            }
        }
    }

    async fn login(&mut self, room_id: u32) -> Result<()> {
        let writer = self.writer.clone().ok_or(DanmuError::ConnectionClosed)?;

        writer
            .write_message(&Message::login_request(room_id))
            .await
            .map_err(|e| DanmuError::RoomJoin(format!("login request not sent: {}", e)))?;

        let reader = self.reader.as_mut().ok_or(DanmuError::ConnectionClosed)?;
        let mut ack = vec![0u8; self.config.login_ack_buffer_size.max(1)];
        let n = tokio::select! {
            biased;
            _ = self.shutdown.triggered() => return Err(DanmuError::ConnectionClosed),
            read = io_deadline(self.config.read_timeout, reader.get_mut().read(&mut ack)) => read
                .map_err(|e| DanmuError::RoomJoin(format!("login response not received: {}", e)))?,
        };
        if n == 0 {
            return Err(DanmuError::RoomJoin(
                "server closed the connection before acknowledging login".to_string(),
            ));
        }
        tracing::debug!(bytes = n, "Login acknowledged");

        writer
            .write_message(&Message::join_group(room_id))
            .await
            .map_err(|e| DanmuError::RoomJoin(format!("join request not sent: {}", e)))
    }

    /// Set the catch-all handler, replacing any previous one.
    pub fn register_handler<H: MessageHandler>(&mut self, handler: H) {
        self.dispatcher.set_handler(handler);
    }

    /// Route one message type to its own handler.
    pub fn on<H: MessageHandler>(&mut self, message_type: impl Into<MessageType>, handler: H) {
        self.dispatcher.route(message_type, handler);
    }

    /// Write a client message and wait until it is on the stream.
    pub async fn send(&mut self, message: &Message) -> Result<()> {
        self.sync_with_shutdown();
        if !matches!(
            self.state,
            SessionState::Connected | SessionState::JoinedRoom
        ) {
            return Err(DanmuError::InvalidState {
                operation: "send",
                state: self.state,
            });
        }

        let writer = self.writer.as_ref().ok_or(DanmuError::ConnectionClosed)?;
        match writer.write_message(message).await {
            Ok(()) => Ok(()),
            Err(DanmuError::ConnectionClosed) => match self.shutdown.cause() {
                Some(cause) => Err(DanmuError::Write(cause)),
                None => Err(DanmuError::ConnectionClosed),
            },
            Err(e) => Err(e),
        }
    }

    /// Read frames and dispatch them until something stops the session.
    ///
    /// Handlers run synchronously in arrival order. This never returns
    /// `Ok`: it ends with the read, protocol or body error that stopped it,
    /// the heartbeat or writer failure, or `ConnectionClosed` after a
    /// [`CloseHandle::close`].
    pub async fn watch(&mut self) -> Result<()> {
        self.expect_state("watch", SessionState::JoinedRoom)?;
        let mut reader = self.reader.take().ok_or(DanmuError::ConnectionClosed)?;

        self.state = SessionState::Watching;
        if self.dispatcher.has_handlers() {
            tracing::info!("Watching for messages");
        } else {
            tracing::warn!("Watching with no handler registered, messages will be dropped");
        }

        let stopped = self.watch_loop(&mut reader).await;
        drop(reader);

        match stopped {
            DanmuError::ConnectionClosed => {
                tracing::info!("Watch stopped: session closed");
                self.teardown();
                self.state = SessionState::Closed;
                Err(DanmuError::ConnectionClosed)
            }
            e => {
                tracing::error!("Watch stopped: {}", e);
                Err(self.fail(e))
            }
        }
    }

    async fn watch_loop(&mut self, reader: &mut FrameReader<BoxedRead>) -> DanmuError {
        let read_timeout = self.config.read_timeout;

        loop {
            let frame = tokio::select! {
                biased;
                _ = self.shutdown.triggered() => {
                    return match self.shutdown.cause() {
                        Some(cause) => DanmuError::Write(cause),
                        None => DanmuError::ConnectionClosed,
                    };
                }
                result = next_frame(reader, read_timeout) => result,
            };

            let message = match frame.and_then(|frame| Message::decode(&frame)) {
                Ok(message) => message,
                Err(e) => return e,
            };

            let message_type = message.message_type();
            tracing::debug!(
                message_type = message_type.as_ref().map(MessageType::as_str).unwrap_or(""),
                "Dispatching message"
            );
            if !self.dispatcher.dispatch(&message) {
                tracing::trace!("No handler registered, message dropped");
            }
        }
    }

    /// Stop the heartbeat and the writer and release the stream.
    ///
    /// Does not wait on the peer: a write stalled on a peer that stopped
    /// reading is abandoned. Idempotent. Reports a heartbeat or writer failure that no other call
    /// has returned yet.
    pub fn close(&mut self) -> Result<()> {
        let unreported = match self.state {
            SessionState::Closed | SessionState::Failed => None,
            _ => self.shutdown.cause(),
        };

        self.teardown();

        if self.state != SessionState::Closed {
            tracing::info!("Session closed");
        }
        self.state = SessionState::Closed;

        match unreported {
            Some(cause) => {
                self.last_error.get_or_insert_with(|| cause.clone());
                Err(DanmuError::Write(cause))
            }
            None => Ok(()),
        }
    }

    /// Handle for closing this session from another task.
    pub fn closer(&self) -> CloseHandle {
        CloseHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        if self.shutdown.is_triggered() && !self.state.is_terminal() {
            if self.shutdown.cause().is_some() {
                SessionState::Failed
            } else {
                SessionState::Closed
            }
        } else {
            self.state
        }
    }

    /// Description of the error that stopped the session, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.clone().or_else(|| self.shutdown.cause())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn expect_state(&mut self, operation: &'static str, expected: SessionState) -> Result<()> {
        self.sync_with_shutdown();
        if self.state == expected {
            Ok(())
        } else {
            Err(DanmuError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Apply a close or background failure signalled from elsewhere.
    fn sync_with_shutdown(&mut self) {
        if !self.shutdown.is_triggered() || self.state.is_terminal() {
            return;
        }
        match self.shutdown.cause() {
            Some(cause) => {
                self.last_error.get_or_insert(cause);
                self.state = SessionState::Failed;
            }
            None => self.state = SessionState::Closed,
        }
        self.teardown();
    }

    fn fail(&mut self, error: DanmuError) -> DanmuError {
        self.last_error = Some(error.to_string());
        self.state = SessionState::Failed;
        self.teardown();
        error
    }

    /// Signal the background tasks and drop both halves of the stream.
    ///
    /// The writer task abandons any frame in flight and shuts the write half
    /// down on the signal. Nothing here waits on a peer.
    fn teardown(&mut self) {
        self.shutdown.trigger();
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
        self.reader = None;
        self.writer = None;
    }

    /// Closed through `close` or a [`CloseHandle`] rather than by a failure.
    fn closed_by_caller(&self) -> bool {
        self.shutdown.is_triggered() && self.shutdown.cause().is_none()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

async fn next_frame(reader: &mut FrameReader<BoxedRead>, limit: Option<Duration>) -> Result<Frame> {
    match limit {
        Some(limit) => match tokio::time::timeout(limit, reader.read_frame()).await {
            Ok(result) => result,
            Err(_) => Err(DanmuError::Read(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no frame within {:?}", limit),
            ))),
        },
        None => reader.read_frame().await,
    }
}
