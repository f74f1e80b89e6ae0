//! Handler module - delivering decoded messages to caller code.
//!
//! Provides:
//! - [`MessageHandler`] - implemented by any `Fn(&Message) + Send` closure
//! - [`Dispatcher`] - the catch-all slot plus per-type routes
//!
//! # Example
//!
//! ```
//! use danmu_client::handler::Dispatcher;
//! use danmu_client::Message;
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.set_handler(|message: &Message| {
//!     if let Some(text) = message.field_str("txt") {
//!         println!("{}", text);
//!     }
//! });
//! ```

mod registry;

pub use registry::{Dispatcher, MessageHandler};
