//! Dispatcher routing decoded messages to handlers.
//!
//! A session owns exactly one [`Dispatcher`]. It holds a catch-all handler
//! slot plus optional per-type routes; a message goes to the route for its
//! `type` when one is registered and to the catch-all otherwise. Messages of
//! unknown types are never dropped by the dispatcher itself.
//!
//! # Example
//!
//! ```
//! use danmu_client::handler::Dispatcher;
//! use danmu_client::{Message, MessageType};
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.set_handler(|message: &Message| {
//!     println!("{:?}", message.message_type());
//! });
//! dispatcher.route(MessageType::ChatMessage, |message: &Message| {
//!     println!("{}", message.field_str("txt").unwrap_or_default());
//! });
//! ```

use std::collections::HashMap;

use crate::message::{Message, MessageType};

/// Trait for message handlers.
///
/// Implemented for every `Fn(&Message) + Send` closure. Handlers run
/// synchronously on the watch loop: the next frame is not read until the
/// call returns, so a handler must not block indefinitely.
pub trait MessageHandler: Send + 'static {
    /// Handle one decoded message.
    fn handle(&self, message: &Message);
}

impl<F> MessageHandler for F
where
    F: Fn(&Message) + Send + 'static,
{
    fn handle(&self, message: &Message) {
        self(message)
    }
}

/// Routes messages to the catch-all handler or a per-type handler.
#[derive(Default)]
pub struct Dispatcher {
    /// Catch-all handler slot.
    fallback: Option<Box<dyn MessageHandler>>,
    /// Handlers by message type.
    routes: HashMap<MessageType, Box<dyn MessageHandler>>,
}

impl Dispatcher {
    /// Create a dispatcher with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the catch-all handler, replacing any previous one.
    pub fn set_handler<H: MessageHandler>(&mut self, handler: H) {
        self.fallback = Some(Box::new(handler));
    }

    /// Route one message type to its own handler, replacing any previous route.
    pub fn route<H: MessageHandler>(&mut self, message_type: impl Into<MessageType>, handler: H) {
        self.routes.insert(message_type.into(), Box::new(handler));
    }

    /// Check if any handler is registered.
    pub fn has_handlers(&self) -> bool {
        self.fallback.is_some() || !self.routes.is_empty()
    }

    /// Deliver a message to its handler.
    ///
    /// Returns `false` when no handler accepted it.
    pub fn dispatch(&self, message: &Message) -> bool {
        let routed = message
            .message_type()
            .and_then(|message_type| self.routes.get(&message_type));

        match routed.or(self.fallback.as_ref()) {
            Some(handler) => {
                handler.handle(message);
                true
            }
            None => false,
        }
    }
}
