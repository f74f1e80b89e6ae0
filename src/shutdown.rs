//! Session-wide shutdown signal.
//!
//! Shared by the session, its heartbeat, its writer supervisor and any
//! [`CloseHandle`](crate::CloseHandle). Firing it is one-way. A background
//! failure fires it together with a recorded cause, which `watch` turns into
//! the error it returns.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

#[derive(Clone, Debug)]
pub(crate) struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
    cause: Arc<Mutex<Option<String>>>,
}

impl Shutdown {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            cause: Arc::new(Mutex::new(None)),
        }
    }

    /// Fire the signal.
    pub(crate) fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Record a background failure and fire the signal. The first cause wins.
    pub(crate) fn fail(&self, cause: impl Into<String>) {
        {
            let mut slot = self.cause.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(cause.into());
            }
        }
        self.trigger();
    }

    pub(crate) fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub(crate) fn cause(&self) -> Option<String> {
        self.cause
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resolves once the signal has fired.
    pub(crate) async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so this only ends when the value is true
        let _ = rx.wait_for(|fired| *fired).await;
    }
}
