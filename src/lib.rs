//! # danmu-client
//!
//! Async client for the danmu (live-chat) push protocol.
//!
//! A client opens a TCP connection, logs in to a room, joins the room's
//! broadcast group and then receives a stream of server-pushed events (chat
//! lines, gifts, user entries, rank changes). A `keeplive` heartbeat keeps the
//! connection open.
//!
//! ## Wire format
//!
//! Every message travels in a little-endian frame:
//!
//! ```text
//! ┌──────────┬──────────┬───────┬────────┬──────────┬──────────┬────────────┐
//! │ length   │ length   │ kind  │ secret │ reserved │ body     │ terminator │
//! │ i32 LE   │ i32 LE   │ u16LE │ u8     │ u8       │ N bytes  │ 0x00       │
//! └──────────┴──────────┴───────┴────────┴──────────┴──────────┴────────────┘
//! ```
//!
//! `length` is `9 + N`. The body is a flat `key@=value/` text record.
//!
//! ## Example
//!
//! ```ignore
//! use danmu_client::{Message, MessageType, Session};
//!
//! #[tokio::main]
//! async fn main() -> danmu_client::Result<()> {
//!     let mut session = Session::builder()
//!         .on(MessageType::ChatMessage, |message: &Message| {
//!             println!(
//!                 "{}: {}",
//!                 message.field_str("nn").unwrap_or_default(),
//!                 message.field_str("txt").unwrap_or_default()
//!             );
//!         })
//!         .connect("openbarrage.douyutv.com", 8601)
//!         .await?;
//!
//!     session.join_room(288016).await?;
//!     session.watch().await
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod protocol;
pub mod session;
pub mod writer;

mod deadline;
mod heartbeat;
mod shutdown;

pub use codec::{BodyCodec, FieldValue, Fields};
pub use config::SessionConfig;
pub use error::{DanmuError, Result};
pub use message::{Message, MessageType};
pub use session::{CloseHandle, Session, SessionBuilder, SessionState};
