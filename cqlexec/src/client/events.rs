//! Client listeners can subscribe to lifecycle events of a client.
//!
//! Every event is also logged through `tracing`. Once the client is shut
//! down, no further event is delivered.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Verbose,
    Info,
    Warning,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Verbose => "verbose",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
        })
    }
}

/// Kind of client event being signalled by [ClientEventListener].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Signalled once, when the first successful connect completes.
    Connected,

    /// A diagnostic message.
    Log { level: LogLevel, message: String },
}

/// Allows listening to client events.
pub trait ClientEventListener: Send + Sync {
    fn on_event(&self, event: &ClientEvent);
}

impl<F> ClientEventListener for F
where
    F: Fn(&ClientEvent) + Send + Sync,
{
    fn on_event(&self, event: &ClientEvent) {
        self(event)
    }
}

#[derive(Default)]
pub(crate) struct EventEmitter {
    listeners: RwLock<Vec<Arc<dyn ClientEventListener>>>,
    closed: AtomicBool,
}

impl EventEmitter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&self, listener: Arc<dyn ClientEventListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Stops delivery of events. Irreversible.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn log(&self, level: LogLevel, message: impl Into<String>) {
        if self.is_closed() {
            return;
        }
        let message = message.into();
        match level {
            LogLevel::Verbose => debug!("{}", message),
            LogLevel::Info => info!("{}", message),
            LogLevel::Warning => warn!("{}", message),
        }
        self.emit(&ClientEvent::Log { level, message });
    }

    pub(crate) fn connected(&self) {
        info!("Client connected");
        self.emit(&ClientEvent::Connected);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn emit(&self, event: &ClientEvent) {
        if self.is_closed() {
            return;
        }
        // Listeners are cloned out so that a listener may subscribe another one.
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.on_event(event);
        }
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
